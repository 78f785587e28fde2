use crate::stats::Progress;
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::task::JoinHandle;

type ProgressCallback = Box<dyn Fn() -> (u64, u64, String) + Send + Sync>;

const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

const DETERMINATE_TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {pos}/{len} {msg}";
const DETERMINATE_TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{bar:25}] {pos}/{len} {msg}";
const INDETERMINATE_TEMPLATE: &str = "{prefix:>12.bold.cyan} {spinner} {msg}";
const INDETERMINATE_TEMPLATE_NO_COLOR: &str = "{prefix:>12} {spinner} {msg}";

const SPINNER: &[&str] = &["-", "\\", "|", "/", " "];

#[derive(Debug)]
struct VisibilityState {
    visible_after: Instant,
    visible: AtomicBool,
    indeterminate: AtomicBool,
    phase_started: Mutex<Instant>,
}

/// A progress bar on stderr that stays hidden until a run has lasted longer than a delay.
///
/// Quick runs (everything served from the cache) therefore print nothing but the summary.
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    state: Arc<VisibilityState>,
    callback: Arc<Mutex<ProgressCallback>>,
    refresh_task: Arc<JoinHandle<()>>,
    use_colors: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn style(template: &str, fallback: ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or(fallback)
}

impl ProgressReporter {
    /// Create a reporter that becomes visible once `delay` has elapsed.
    ///
    /// Must be called from within a Tokio runtime, which drives the refresh.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::hidden();

        let now = Instant::now();
        let state = Arc::new(VisibilityState {
            visible_after: now + delay,
            visible: AtomicBool::new(false),
            indeterminate: AtomicBool::new(true),
            phase_started: Mutex::new(now),
        });

        let callback = Arc::new(Mutex::new(Box::new(|| (0_u64, 0_u64, String::new())) as ProgressCallback));

        Self {
            refresh_task: Arc::new(tokio::spawn(refresh(bar.clone(), Arc::clone(&state), Arc::clone(&callback)))),
            bar,
            state,
            callback,
            use_colors,
        }
    }
}

impl Progress for ProgressReporter {
    fn set_phase(&self, phase: &str) {
        self.bar.set_prefix(phase.to_string());
        *lock(&self.state.phase_started) = Instant::now();
    }

    fn set_determinate(&self, callback: Box<dyn Fn() -> (u64, u64, String) + Send + Sync + 'static>) {
        *lock(&self.callback) = callback;
        self.state.indeterminate.store(false, Ordering::Relaxed);
        self.bar.disable_steady_tick();
        self.bar.set_length(0);
        self.bar.set_position(0);

        let template = if self.use_colors { DETERMINATE_TEMPLATE } else { DETERMINATE_TEMPLATE_NO_COLOR };
        self.bar.set_style(style(template, ProgressStyle::default_bar()).progress_chars("=> "));
    }

    fn set_indeterminate(&self, callback: Box<dyn Fn() -> String + Send + Sync + 'static>) {
        *lock(&self.callback) = Box::new(move || (0, 0, callback()));
        *lock(&self.state.phase_started) = Instant::now();
        self.state.indeterminate.store(true, Ordering::Relaxed);
        self.bar.enable_steady_tick(REFRESH_INTERVAL);

        let template = if self.use_colors { INDETERMINATE_TEMPLATE } else { INDETERMINATE_TEMPLATE_NO_COLOR };
        self.bar.set_style(style(template, ProgressStyle::default_spinner()).tick_strings(SPINNER));
    }

    fn done(&self) {
        self.refresh_task.abort();
        if self.state.visible.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("state", &self.state)
            .field("callback", &"<callback>")
            .field("use_colors", &self.use_colors)
            .finish_non_exhaustive()
    }
}

/// Periodically pull the current status from the callback into the bar.
async fn refresh(bar: ProgressBar, state: Arc<VisibilityState>, callback: Arc<Mutex<ProgressCallback>>) {
    let mut interval = tokio::time::interval(REFRESH_INTERVAL);
    #[expect(clippy::infinite_loop, reason = "task runs until aborted")]
    loop {
        let _ = interval.tick().await;

        if !state.visible.load(Ordering::Relaxed) {
            if Instant::now() < state.visible_after {
                continue;
            }
            state.visible.store(true, Ordering::Relaxed);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }

        let (length, position, mut message) = lock(&callback)();

        if state.indeterminate.load(Ordering::Relaxed) {
            let elapsed = lock(&state.phase_started).elapsed().as_secs();
            message = format!("{elapsed}s: {message}");
        }

        if length > 0 {
            bar.set_length(length);
            bar.set_position(position);
        }
        bar.set_message(message);
    }
}
