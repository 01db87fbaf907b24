//! Watch mode: initial build, then rebuild-on-change with live reload.

use std::collections::BTreeSet;
use std::path::Path;

use gantry_tasks::{Pipeline, ProjectPaths, Task, TaskReport};
use tokio::sync::mpsc;

use crate::server::{DevServer, DevServerConfig, ServerError};
use crate::watcher::{FileWatcher, WatchEvent};
use crate::websocket::{ReloadHub, ReloadMessage};

/// Tasks to re-run for a batch of changes, in a stable order.
pub fn tasks_for(paths: &ProjectPaths, events: &[WatchEvent]) -> BTreeSet<Task> {
    events
        .iter()
        .filter_map(|event| paths.classify(&event.path))
        .collect()
}

/// Message announcing a finished task to the browsers.
pub fn reload_message(paths: &ProjectPaths, report: &TaskReport) -> Vec<ReloadMessage> {
    if report.task != Task::Css {
        return vec![ReloadMessage::Reload];
    }

    let dist = paths.dist_dir();
    let updates: Vec<ReloadMessage> = report
        .outputs
        .iter()
        .filter_map(|output| url_path(dist, output))
        .map(|path| ReloadMessage::CssUpdate { path })
        .collect();

    if updates.is_empty() {
        vec![ReloadMessage::Reload]
    } else {
        updates
    }
}

/// URL path of a file under the served folder.
fn url_path(dist: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(dist).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    Some(format!("/{}", segments.join("/")))
}

/// Run one task and notify browsers; failures are logged, never fatal.
pub async fn dispatch(pipeline: &Pipeline, hub: &ReloadHub, task: Task) {
    match pipeline.run(task).await {
        Ok(report) => {
            for msg in reload_message(pipeline.paths(), &report) {
                hub.send(msg);
            }
        }
        Err(e) => tracing::error!("{}", e),
    }
}

/// Re-run tasks for every batch of changes until the channel closes.
pub async fn watch_loop(pipeline: Pipeline, hub: ReloadHub, mut rx: mpsc::Receiver<Vec<WatchEvent>>) {
    while let Some(events) = rx.recv().await {
        for event in &events {
            tracing::debug!("{:?} {}", event.kind, event.path.display());
        }

        for task in tasks_for(pipeline.paths(), &events) {
            dispatch(&pipeline, &hub, task).await;
        }
    }
}

/// Build once, then serve the output folder and rebuild on changes until
/// the process ends.
pub async fn serve_and_watch(pipeline: Pipeline, server: DevServerConfig) -> Result<(), ServerError> {
    match pipeline.build().await {
        Ok(result) => tracing::info!(
            "Built {} files in {} ms",
            result.files(),
            result.duration_ms
        ),
        Err(e) => tracing::error!("Initial build failed: {}", e),
    }

    let hub = ReloadHub::new();

    let watch_root = pipeline.paths().src_dir().to_path_buf();
    let (watcher, rx) =
        FileWatcher::new(&[watch_root]).map_err(|e| ServerError::Watch(e.to_string()))?;

    let loop_hub = hub.clone();
    tokio::spawn(async move {
        watch_loop(pipeline, loop_hub, rx).await;
        // Keep watcher alive
        drop(watcher);
    });

    DevServer::new(server, hub).start().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::ChangeKind;
    use gantry_tasks::{PathsConfig, PipelineConfig};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn event(path: &str) -> WatchEvent {
        WatchEvent {
            path: PathBuf::from(path),
            kind: ChangeKind::Modified,
        }
    }

    #[test]
    fn maps_changes_to_tasks() {
        let paths = ProjectPaths::new("/work/site", &PathsConfig::default());
        let events = [
            event("/work/site/src/scss/_grid.scss"),
            event("/work/site/src/scss/style.scss"),
            event("/work/site/src/_footer.html"),
            event("/work/site/src/notes.txt"),
        ];

        let tasks: Vec<Task> = tasks_for(&paths, &events).into_iter().collect();

        assert_eq!(tasks, vec![Task::Html, Task::Css]);
    }

    #[test]
    fn css_reports_become_stylesheet_updates() {
        let paths = ProjectPaths::new("/work/site", &PathsConfig::default());
        let report = TaskReport {
            task: Task::Css,
            outputs: vec![paths.build.css.join("style.css")],
            skipped: 0,
            duration_ms: 1,
        };

        assert_eq!(
            reload_message(&paths, &report),
            vec![ReloadMessage::CssUpdate {
                path: "/css/style.css".to_string()
            }]
        );

        let report = TaskReport {
            task: Task::Js,
            ..report
        };
        assert_eq!(reload_message(&paths, &report), vec![ReloadMessage::Reload]);
    }

    #[tokio::test]
    async fn loop_rebuilds_and_survives_failures() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("site");
        let scss = root.join("src/scss");
        fs::create_dir_all(&scss).unwrap();
        fs::write(scss.join("style.scss"), ".a { .b { color: red; } }").unwrap();

        let paths = ProjectPaths::new(&root, &PathsConfig::default());
        let pipeline = Pipeline::new(PipelineConfig::new(paths.clone()));
        let hub = ReloadHub::new();
        let mut client = hub.subscribe();
        let (tx, rx) = mpsc::channel(4);

        let handle = tokio::spawn(watch_loop(pipeline, hub, rx));

        // js entry is missing: logged, loop keeps going
        let js = root.join("src/js/script.js");
        tx.send(vec![WatchEvent {
            path: js,
            kind: ChangeKind::Created,
        }])
        .await
        .unwrap();
        tx.send(vec![WatchEvent {
            path: scss.join("style.scss"),
            kind: ChangeKind::Modified,
        }])
        .await
        .unwrap();
        drop(tx);

        handle.await.unwrap();

        assert!(paths.build.css.join("style.css").exists());
        assert!(matches!(
            client.try_recv().unwrap(),
            ReloadMessage::CssUpdate { .. }
        ));
    }
}
