//! Callback hooks (C1 cont'd): fired at replica, batch and engine boundaries,
//! plus on every step when an event callback is configured.

use std::path::Path;
use std::process::Command;

/// A read-only view of whatever the engine reached when a hook fired.
/// Callbacks are static-dispatched, so a single callback type must implement
/// [`Callback`] for every view it's wired to — the blanket impl on
/// [`HookCallback`] below does this by simply ignoring the view.
pub trait Callback<Ctx: ?Sized>: Send + Sync + 'static {
    fn invoke(&self, ctx: &Ctx);
}

/// Fired once per engine run, after every batch has finished.
pub struct EngineView<'a> {
    pub workspace: &'a Path,
}

/// Fired once per batch, after its replica 0 instance finishes.
pub struct BatchView<'a> {
    pub workspace: &'a Path,
    pub batch: &'a str,
}

/// Fired per replica (instance callback, on termination) or per step (event callback).
pub struct TaskView<'a> {
    pub workspace: &'a Path,
    pub batch: &'a str,
    pub replica: usize,
    pub step: u64,
}

/// Convenience bound for a callback type usable at all four hook points.
pub trait SimCallback:
    for<'a> Callback<EngineView<'a>> + for<'a> Callback<BatchView<'a>> + for<'a> Callback<TaskView<'a>>
{
}
impl<T> SimCallback for T where
    T: for<'a> Callback<EngineView<'a>>
        + for<'a> Callback<BatchView<'a>>
        + for<'a> Callback<TaskView<'a>>
{
}

/// The default callback: an optional URL fetched with a blocking GET, and/or
/// an optional shell command run to completion. Neither failure is fatal —
/// both are best-effort notifications, logged and otherwise ignored.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct HookCallback {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
}

impl HookCallback {
    fn fire(&self) {
        if let Some(url) = &self.url {
            match reqwest::blocking::get(url) {
                Ok(resp) => log::debug!("hook: GET {} -> {}", url, resp.status()),
                Err(e) => log::warn!("hook: GET {} failed: {}", url, e),
            }
        }
        if let Some(script) = &self.script {
            let status = if cfg!(target_os = "windows") {
                Command::new("cmd").args(["/C", script]).status()
            } else {
                Command::new("sh").arg("-c").arg(script).status()
            };
            match status {
                Ok(s) if s.success() => log::debug!("hook: script '{}' exited 0", script),
                Ok(s) => log::warn!("hook: script '{}' exited {:?}", script, s.code()),
                Err(e) => log::warn!("hook: script '{}' failed to start: {}", script, e),
            }
        }
    }
}

impl<Ctx: ?Sized> Callback<Ctx> for HookCallback {
    fn invoke(&self, _ctx: &Ctx) {
        self.fire();
    }
}
