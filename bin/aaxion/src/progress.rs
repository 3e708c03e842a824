use std::{
    io::{stderr, IsTerminal},
    sync::{Arc, Mutex},
};

use aaxion::{ProgressCallback, ProgressEvent, Stage};
use kdam::{tqdm, Bar, BarExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Stage(Stage),
    Download,
}

type CurrentBar = Option<(Task, Bar)>;

/// Draws one progress bar per stage or download on stderr.
///
/// When stderr is not a terminal, finished stages and downloads are logged instead.
pub fn terminal_progress() -> ProgressCallback {
    if !stderr().is_terminal() {
        return Arc::new(log_progress);
    }

    let current: Mutex<CurrentBar> = Mutex::new(None);
    Arc::new(move |event| {
        let Ok(mut current) = current.lock() else {
            return;
        };
        if let Err(error) = render(&mut current, event) {
            tracing::debug!("Failed to draw progress: {error}");
        }
    })
}

fn log_progress(event: ProgressEvent) {
    match event {
        ProgressEvent::StageFinished { stage } => tracing::info!("{stage}: done"),
        ProgressEvent::DownloadFinished { received } => {
            tracing::info!("Downloaded {received} bytes")
        }
        ProgressEvent::Transcode { .. } | ProgressEvent::Download { .. } => {}
    }
}

fn stage_bar(stage: Stage) -> Bar {
    tqdm!(
        total = 100,
        desc = stage.label().to_owned(),
        unit = "%".to_owned(),
        dynamic_ncols = true
    )
}

/// An unknown size leaves `total` at 0, which kdam draws as a plain counter.
fn download_bar(total: Option<u64>) -> Bar {
    tqdm!(
        total = total.unwrap_or_default() as usize,
        desc = "Downloading".to_owned(),
        unit = "B".to_owned(),
        unit_scale = true,
        unit_divisor = 1024,
        dynamic_ncols = true
    )
}

/// The bar for `task`, replacing a bar left over from another task.
fn bar_for(current: &mut CurrentBar, task: Task, create: impl FnOnce() -> Bar) -> &mut Bar {
    if matches!(current, Some((running, _)) if *running != task) {
        *current = None;
        eprintln!();
    }
    &mut current.get_or_insert_with(|| (task, create())).1
}

fn finish(current: &mut CurrentBar) -> std::io::Result<()> {
    if let Some((_, mut bar)) = current.take() {
        bar.refresh()?;
        eprintln!();
    }
    Ok(())
}

fn render(current: &mut CurrentBar, event: ProgressEvent) -> std::io::Result<()> {
    match event {
        ProgressEvent::Transcode { stage, percent } => {
            bar_for(current, Task::Stage(stage), || stage_bar(stage)).update_to(percent as usize)?;
        }
        ProgressEvent::StageFinished { stage } => {
            bar_for(current, Task::Stage(stage), || stage_bar(stage)).update_to(100)?;
            finish(current)?;
        }
        ProgressEvent::Download { received, total } => {
            bar_for(current, Task::Download, || download_bar(total))
                .update_to(received as usize)?;
        }
        ProgressEvent::DownloadFinished { received } => {
            let bar = bar_for(current, Task::Download, || download_bar(Some(received)));
            if bar.total == 0 {
                bar.total = received as usize;
            }
            bar.update_to(received as usize)?;
            finish(current)?;
        }
    }
    Ok(())
}
