use crossbeam_channel::{Sender, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Average interleaved frames down to one channel. A trailing partial frame
/// is averaged over the channels it has.
pub(super) fn downmix_into<T, F>(out: &mut Vec<f32>, data: &[T], channels: usize, mut convert: F)
where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        out.extend(data.iter().map(|&s| convert(s)));
        return;
    }
    out.extend(data.chunks(channels).map(|frame| {
        let sum: f32 = frame.iter().map(|&s| convert(s)).sum();
        sum / frame.len() as f32
    }));
}

/// Counters shared between the cpal callback and the capture thread.
#[derive(Debug, Default)]
pub(super) struct DispatchStats {
    sent: AtomicUsize,
    dropped: AtomicUsize,
}

impl DispatchStats {
    pub(super) fn sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }

    pub(super) fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Lives inside the cpal data callback. Regroups whatever block size the
/// driver hands over into fixed mono frames and forwards them without ever
/// blocking; frames the consumer has no room for are counted and discarded.
pub(super) struct FrameDispatcher {
    frame_len: usize,
    pending: Vec<f32>,
    sender: Sender<Vec<f32>>,
    stats: Arc<DispatchStats>,
}

impl FrameDispatcher {
    pub(super) fn new(frame_len: usize, sender: Sender<Vec<f32>>, stats: Arc<DispatchStats>) -> Self {
        let frame_len = frame_len.max(1);
        Self {
            frame_len,
            pending: Vec::with_capacity(frame_len * 2),
            sender,
            stats,
        }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        downmix_into(&mut self.pending, data, channels, convert);
        let ready = self.pending.len() / self.frame_len * self.frame_len;
        if ready == 0 {
            return;
        }
        let mut drained = self.pending.drain(..ready);
        loop {
            let frame: Vec<f32> = drained.by_ref().take(self.frame_len).collect();
            if frame.is_empty() {
                break;
            }
            match self.sender.try_send(frame) {
                Ok(()) => {
                    self.stats.sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(_)) => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn stereo_frames_average_to_mono() {
        let mut out = Vec::new();
        downmix_into(&mut out, &[1.0f32, 0.0, 0.5, 0.5, 0.25], 2, |s| s);
        assert_eq!(out, vec![0.5, 0.5, 0.25]);
    }

    #[test]
    fn i16_samples_convert_through_the_callback() {
        let mut out = Vec::new();
        downmix_into(&mut out, &[16_384i16, -16_384], 1, |s| f32::from(s) / 32_768.0);
        assert_eq!(out, vec![0.5, -0.5]);
    }

    #[test]
    fn dispatcher_regroups_blocks_into_frames() {
        let (tx, rx) = bounded(8);
        let stats = Arc::new(DispatchStats::default());
        let mut dispatcher = FrameDispatcher::new(4, tx, Arc::clone(&stats));
        dispatcher.push(&[0.1f32; 3], 1, |s| s);
        assert!(rx.try_recv().is_err());
        dispatcher.push(&[0.2f32; 6], 1, |s| s);
        assert_eq!(rx.try_recv().unwrap(), vec![0.1, 0.1, 0.1, 0.2]);
        assert_eq!(rx.try_recv().unwrap(), vec![0.2; 4]);
        assert!(rx.try_recv().is_err());
        assert_eq!(stats.sent(), 2);
        assert_eq!(dispatcher.pending.len(), 1);
    }

    #[test]
    fn full_channel_counts_drops_instead_of_blocking() {
        let (tx, rx) = bounded(1);
        let stats = Arc::new(DispatchStats::default());
        let mut dispatcher = FrameDispatcher::new(2, tx, Arc::clone(&stats));
        dispatcher.push(&[0.0f32; 8], 1, |s| s);
        assert_eq!(stats.sent(), 1);
        assert_eq!(stats.dropped(), 3);
        drop(rx);
    }
}
