use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use lorafetch_engine::{AcquireState, ProgressEvent};
use std::{
    collections::HashMap,
    io::{self, Write},
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing_subscriber::fmt::MakeWriter;

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {bytes}/{total_bytes} @ {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Renders acquisition events as one progress bar per URL
#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    bars: Arc<Mutex<HashMap<Arc<str>, ProgressBar>>>,
    disabled: bool,
}

impl ProgressManager {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Arc::new(Mutex::new(HashMap::new())),
            disabled: false,
        }
    }

    pub fn new_disabled(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Arc::new(Mutex::new(HashMap::new())),
            disabled: true,
        }
    }

    pub fn handle_event(&self, event: ProgressEvent) {
        if self.disabled {
            return;
        }

        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        match event {
            ProgressEvent::StateChanged { url, state } => match state {
                AcquireState::Downloading => {
                    let bar = self.multi.add(ProgressBar::new(0));
                    bar.set_style(download_style());
                    bar.set_message(format!("Downloading {url}"));
                    bar.enable_steady_tick(Duration::from_millis(500));
                    bars.insert(url, bar);
                }
                AcquireState::Scanning => {
                    if let Some(bar) = bars.get(&url) {
                        bar.set_message(format!("Scanning archive {url}"));
                    }
                }
                AcquireState::Extracting => {
                    if let Some(bar) = bars.get(&url) {
                        bar.set_position(0);
                        bar.set_message(format!("Extracting from {url}"));
                    }
                }
                AcquireState::Failed => {
                    if let Some(bar) = bars.remove(&url) {
                        bar.abandon_with_message(format!("Failed {url}"));
                    }
                }
                AcquireState::Done => {}
            },
            ProgressEvent::Progress {
                url,
                bytes,
                total_bytes,
            } => {
                if let Some(bar) = bars.get(&url) {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes);
                }
            }
            ProgressEvent::Finished { url, path } => {
                if let Some(bar) = bars.remove(&url) {
                    bar.finish_with_message(format!("Saved {}", path.display()));
                }
            }
        }
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

/// Log writer that hides the progress bars while each event is written
pub struct SuspendingWriter<M> {
    multi: MultiProgress,
    inner: M,
}

impl<M> SuspendingWriter<M> {
    pub fn new(multi: MultiProgress, inner: M) -> Self {
        Self { multi, inner }
    }
}

impl<'a, M: MakeWriter<'a> + 'a> MakeWriter<'a> for SuspendingWriter<M> {
    type Writer = SuspendedLine<'a, M>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedLine {
            multi: &self.multi,
            inner: &self.inner,
            buf: Vec::new(),
        }
    }
}

/// One formatted event, flushed to the inner writer on drop
pub struct SuspendedLine<'a, M: MakeWriter<'a>> {
    multi: &'a MultiProgress,
    inner: &'a M,
    buf: Vec<u8>,
}

impl<'a, M: MakeWriter<'a>> Write for SuspendedLine<'a, M> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a, M: MakeWriter<'a>> Drop for SuspendedLine<'a, M> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let inner = self.inner;
        let buf = &self.buf;
        self.multi.suspend(|| {
            let mut writer = inner.make_writer();
            let _ = writer.write_all(buf);
            let _ = writer.flush();
        });
    }
}
