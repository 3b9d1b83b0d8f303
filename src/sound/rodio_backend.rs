//! Rodio output backend
//!
//! Each channel owns at most one `Sink`. Starting a sound replaces the
//! channel's sink; a sink that drains is reported idle on the next poll.

use std::io::Cursor;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::backend::AudioBackend;
use super::buffer::SoundBuffer;
use super::types::{AudioError, AudioResult, ChannelId};

pub struct RodioBackend {
    // Dropping the stream silences every sink
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sinks: Vec<Option<Sink>>,
    stopped: Vec<ChannelId>,
    volume: f32,
}

impl RodioBackend {
    /// Open the default output device
    pub fn open(channels: usize) -> AudioResult<Self> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::Device(e.to_string()))?;
        log::info!("audio output opened with {} channels", channels);
        Ok(Self {
            _stream: stream,
            stream_handle,
            sinks: (0..channels).map(|_| None).collect(),
            stopped: Vec::new(),
            volume: 1.0,
        })
    }

    /// Master volume, 0.0 to 1.0, applied to every channel
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        for sink in self.sinks.iter().flatten() {
            sink.set_volume(self.volume);
        }
    }

    fn sink(&self, channel: ChannelId) -> Option<&Sink> {
        self.sinks.get(channel).and_then(Option::as_ref)
    }
}

impl AudioBackend for RodioBackend {
    fn channel_count(&self) -> usize {
        self.sinks.len()
    }

    fn play(&mut self, channel: ChannelId, buffer: &SoundBuffer, looping: bool) -> AudioResult<()> {
        let count = self.sinks.len();
        let slot = self
            .sinks
            .get_mut(channel)
            .ok_or(AudioError::ChannelOutOfRange { channel, count })?;

        let source = Decoder::new(Cursor::new(buffer.data().to_vec()))
            .map_err(|e| AudioError::Device(format!("decode '{}': {}", buffer.path(), e)))?;
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::Device(format!("sink for channel {}: {}", channel, e)))?;
        sink.set_volume(self.volume);

        if looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }

        if let Some(old) = slot.replace(sink) {
            old.stop();
        }
        log::debug!("channel {}: playing '{}' loop={}", channel, buffer.path(), looping);
        Ok(())
    }

    fn stop(&mut self, channel: ChannelId) {
        if let Some(sink) = self.sinks.get_mut(channel).and_then(Option::take) {
            sink.stop();
            self.stopped.push(channel);
        }
    }

    fn pause(&mut self, channel: ChannelId) {
        if let Some(sink) = self.sink(channel) {
            sink.pause();
        }
    }

    fn resume(&mut self, channel: ChannelId) {
        if let Some(sink) = self.sink(channel) {
            sink.play();
        }
    }

    fn is_busy(&self, channel: ChannelId) -> bool {
        self.sink(channel).is_some_and(|sink| !sink.empty())
    }

    fn poll_finished(&mut self) -> Vec<ChannelId> {
        let mut finished = std::mem::take(&mut self.stopped);
        for (channel, slot) in self.sinks.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(Sink::empty) {
                *slot = None;
                finished.push(channel);
            }
        }
        finished
    }
}
