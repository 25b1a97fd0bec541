use std::path::Path;

use anyhow::{Context, Result};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

use crate::types::WaveformSignal;

/// Decode an audio file into a mono waveform (channels averaged, f32 in [-1.0, 1.0]).
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<WaveformSignal> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("failed to probe audio format of {}", path.display()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("no audio tracks found in file")?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("sample rate not specified in audio file")?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("failed to create decoder")?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(err).context("failed to read packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => samples.extend(mix_to_mono(&decoded)),
            Err(SymphoniaError::DecodeError(reason)) => {
                warn!(reason, path = %path.display(), "skipping undecodable packet");
            }
            Err(err) => return Err(err).context("failed to decode audio packet"),
        }
    }

    debug!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate,
        "decoded audio"
    );
    Ok(WaveformSignal::from_samples(samples, sample_rate))
}

fn mix_to_mono(buffer: &AudioBufferRef<'_>) -> Vec<f32> {
    match buffer {
        AudioBufferRef::U8(buf) => average_channels(&**buf),
        AudioBufferRef::U16(buf) => average_channels(&**buf),
        AudioBufferRef::U24(buf) => average_channels(&**buf),
        AudioBufferRef::U32(buf) => average_channels(&**buf),
        AudioBufferRef::S8(buf) => average_channels(&**buf),
        AudioBufferRef::S16(buf) => average_channels(&**buf),
        AudioBufferRef::S24(buf) => average_channels(&**buf),
        AudioBufferRef::S32(buf) => average_channels(&**buf),
        AudioBufferRef::F32(buf) => average_channels(&**buf),
        AudioBufferRef::F64(buf) => average_channels(&**buf),
    }
}

fn average_channels<S>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    S: Sample + IntoSample<f32>,
{
    let channels = buf.spec().channels.count();
    let mut mono = vec![0.0_f32; buf.frames()];
    if channels == 0 {
        return mono;
    }
    for ch in 0..channels {
        for (acc, &sample) in mono.iter_mut().zip(buf.chan(ch)) {
            let value: f32 = sample.into_sample();
            *acc += value;
        }
    }
    let scale = 1.0 / channels as f32;
    mono.iter_mut().for_each(|sample| *sample *= scale);
    mono
}
