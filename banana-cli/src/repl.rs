//! Line-oriented front end over a [`Workspace`].

use anyhow::{anyhow, bail, Context};
use banana_core::{ImageContent, ImageId, ImageRef};
use banana_session::{EditBackend, EditError, EditOutcome, Workspace};
use std::fs;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::commands::{self, mime_for_path, Command, HELP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Read commands from `input` until EOF or `quit`.
pub async fn run<B, R, W>(ws: &Workspace<B>, input: R, out: &mut W) -> anyhow::Result<()>
where
    B: EditBackend,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    prompt(out)?;

    while let Some(line) = lines.next_line().await.context("read command")? {
        match commands::parse(&line) {
            Ok(Some(command)) => match execute(ws, command, out).await {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(out, "error: {e:#}")?,
            },
            Ok(None) => {}
            Err(e) => writeln!(out, "error: {e}")?,
        }
        prompt(out)?;
    }

    Ok(())
}

fn prompt<W: Write>(out: &mut W) -> anyhow::Result<()> {
    write!(out, "banana> ")?;
    out.flush()?;
    Ok(())
}

/// Run one command against the workspace.
pub async fn execute<B, W>(ws: &Workspace<B>, command: Command, out: &mut W) -> anyhow::Result<Flow>
where
    B: EditBackend,
    W: Write,
{
    match command {
        Command::Load(path) => {
            let image = load(ws, &path)?;
            writeln!(
                out,
                "loaded {} ({} bytes) as {}",
                path.display(),
                image.content().len(),
                short_id(image.id())
            )?;
        }
        Command::Edit(instruction) => {
            writeln!(out, "editing: {instruction}")?;
            let outcome = tokio::select! {
                outcome = ws.request_edit(&instruction) => Some(outcome),
                _ = tokio::signal::ctrl_c() => None,
            };
            match outcome {
                Some(Ok(EditOutcome::Committed(image))) => writeln!(
                    out,
                    "done: {} ({} bytes), {} versions",
                    short_id(image.id()),
                    image.content().len(),
                    ws.len()
                )?,
                Some(Ok(EditOutcome::Abandoned)) => writeln!(out, "edit discarded")?,
                Some(Err(e)) if e.is_rejection() => writeln!(out, "rejected: {e}")?,
                Some(Err(e @ EditError::Stale)) => writeln!(out, "discarded: {e}")?,
                Some(Err(e)) => writeln!(out, "{e}. Please try again.")?,
                None => writeln!(out, "edit cancelled")?,
            }
        }
        Command::Undo => {
            ws.undo()?;
            print_current(ws, out)?;
        }
        Command::Rewind(target) => {
            let id = resolve_target(&ws.entries(), &target)?;
            ws.rewind_to(id)?;
            print_current(ws, out)?;
        }
        Command::History => print_history(&ws.entries(), out)?,
        Command::Status => {
            let view = ws.snapshot();
            writeln!(
                out,
                "status: {:?}, {} versions",
                view.status,
                view.entries.len()
            )?;
            if let Some(error) = view.last_error {
                writeln!(out, "last error: {error}")?;
            }
        }
        Command::Save(path) => {
            let current = ws.current().ok_or_else(|| anyhow!("no image loaded"))?;
            fs::write(&path, current.content().as_bytes())
                .with_context(|| format!("write image: {}", path.display()))?;
            info!(path = %path.display(), image_id = %current.id(), "saved current image");
            writeln!(out, "saved {} to {}", short_id(current.id()), path.display())?;
        }
        Command::Clear => {
            ws.clear_workspace();
            writeln!(out, "cleared")?;
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

/// Read an image file into the workspace, replacing any history.
pub fn load<B: EditBackend>(ws: &Workspace<B>, path: &Path) -> anyhow::Result<ImageRef> {
    let bytes = fs::read(path).with_context(|| format!("read image: {}", path.display()))?;
    if bytes.is_empty() {
        bail!("image file is empty: {}", path.display());
    }
    Ok(ws.load_image(ImageContent::new(mime_for_path(path), bytes)))
}

/// Resolve `target` as an entry index (0 = current) or a unique id prefix.
///
/// A number within range is always an index. Anything else, numbers included, is
/// matched against id prefixes.
pub fn resolve_target(entries: &[ImageRef], target: &str) -> anyhow::Result<ImageId> {
    let target = target.trim();
    let index = target.parse::<usize>().ok();

    if let Some(entry) = index.and_then(|i| entries.get(i)) {
        return Ok(entry.id());
    }

    let needle = target.to_ascii_lowercase();
    let matches: Vec<&ImageRef> = entries
        .iter()
        .filter(|e| e.id().to_string().starts_with(&needle))
        .collect();

    match (matches.as_slice(), index) {
        ([only], _) => Ok(only.id()),
        ([], Some(i)) => bail!("no entry #{i} ({} versions)", entries.len()),
        ([], None) => bail!("no version matches '{target}'"),
        (many, _) => {
            warn!(target = %target, matches = many.len(), "ambiguous id prefix");
            bail!("'{target}' matches {} versions, use more characters", many.len())
        }
    }
}

fn print_current<B: EditBackend, W: Write>(ws: &Workspace<B>, out: &mut W) -> anyhow::Result<()> {
    match ws.current() {
        Some(current) => writeln!(
            out,
            "current: {} \"{}\", {} versions",
            short_id(current.id()),
            current.label(),
            ws.len()
        )?,
        None => writeln!(out, "no image loaded")?,
    }
    Ok(())
}

fn print_history<W: Write>(entries: &[ImageRef], out: &mut W) -> anyhow::Result<()> {
    if entries.is_empty() {
        writeln!(out, "no image loaded")?;
        return Ok(());
    }
    for (i, entry) in entries.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        writeln!(
            out,
            "{marker} {i:>2}  {}  {:>9} B  \"{}\"",
            short_id(entry.id()),
            entry.content().len(),
            entry.label()
        )?;
    }
    Ok(())
}

fn short_id(id: ImageId) -> String {
    id.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use banana_session::{BackendError, MockBackend, SessionStatus};

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn image(label: &str) -> ImageRef {
        ImageRef::new(ImageContent::new("image/png", vec![1]), label)
    }

    #[test]
    fn test_resolve_by_index_and_prefix() {
        let entries = vec![image("b"), image("a")];

        assert_eq!(resolve_target(&entries, "1").unwrap(), entries[1].id());

        let prefix: String = entries[1].id().to_string().chars().take(8).collect();
        assert_eq!(resolve_target(&entries, &prefix).unwrap(), entries[1].id());

        let full = entries[0].id().to_string().to_uppercase();
        assert_eq!(resolve_target(&entries, &full).unwrap(), entries[0].id());

        assert!(resolve_target(&entries, "zzzz-not-an-id").is_err());
    }

    #[test]
    fn test_out_of_range_numbers_share_one_rule() {
        let entries = vec![image("b"), image("a")];

        for target in ["7", "123", "9999", "1234567"] {
            let digits_prefix = entries
                .iter()
                .any(|e| e.id().to_string().starts_with(target));
            if digits_prefix {
                continue;
            }
            let err = resolve_target(&entries, target).unwrap_err();
            assert!(err.to_string().contains("no entry #"), "{target}: {err}");
        }
    }

    #[test]
    fn test_resolve_empty_prefix_is_ambiguous() {
        let entries = vec![image("b"), image("a")];
        let err = resolve_target(&entries, "").unwrap_err();
        assert!(err.to_string().contains("matches 2 versions"));
    }

    #[tokio::test]
    async fn test_session_script() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("cat.png");
        let output_path = dir.path().join("out.png");
        fs::write(&input_path, b"cat").unwrap();

        let backend = MockBackend::new();
        let ws = Workspace::new(backend.clone());

        let script = format!(
            "load {}\nedit add hat\nedit   \nhistory\nsave {}\nquit\nedit never runs\n",
            input_path.display(),
            output_path.display()
        );
        let mut out = Vec::new();
        run(&ws, script.as_bytes(), &mut out).await.unwrap();

        let text = output(out);
        assert!(text.contains("loaded"));
        assert!(text.contains("done:"));
        assert!(text.contains("\"add hat\""));
        assert!(text.contains("error: `edit` needs an instruction"));
        assert_eq!(backend.call_count(), 1);
        assert_eq!(fs::read(&output_path).unwrap(), b"catadd hat");
    }

    #[tokio::test]
    async fn test_failed_edit_reports_and_keeps_image() {
        let backend = MockBackend::new();
        backend.expect_error(BackendError::Timeout);
        let ws = Workspace::new(backend);
        ws.load_image(ImageContent::new("image/png", b"cat".to_vec()));

        let mut out = Vec::new();
        execute(&ws, Command::Edit("add hat".into()), &mut out)
            .await
            .unwrap();
        execute(&ws, Command::Status, &mut out).await.unwrap();

        let text = output(out);
        assert!(text.contains("Please try again"));
        assert!(text.contains("last error"));
        assert_eq!(ws.status(), SessionStatus::Failed);
        assert_eq!(ws.len(), 1);
    }

    #[tokio::test]
    async fn test_undo_at_boundary_is_an_error() {
        let ws = Workspace::new(MockBackend::new());
        ws.load_image(ImageContent::new("image/png", b"cat".to_vec()));

        let mut out = Vec::new();
        let err = execute(&ws, Command::Undo, &mut out).await.unwrap_err();
        assert!(err.to_string().contains("nothing to undo"));
    }

    #[tokio::test]
    async fn test_rewind_and_clear() {
        let ws = Workspace::new(MockBackend::new());
        let upload = ws.load_image(ImageContent::new("image/png", b"cat".to_vec()));
        ws.request_edit("add hat").await.unwrap();

        let mut out = Vec::new();
        execute(&ws, Command::Rewind("1".into()), &mut out)
            .await
            .unwrap();
        assert_eq!(ws.current(), Some(upload));

        execute(&ws, Command::Clear, &mut out).await.unwrap();
        assert!(ws.is_empty());
        assert!(execute(&ws, Command::Save("x.png".into()), &mut out)
            .await
            .is_err());
    }
}
