// tests/stream_pump.rs
mod common;
use crate::common::init_tracing;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use toolstream::pump::{PumpStats, pump_stream, spawn_pump};
use toolstream::task::TaskError;
use toolstream::types::{Tag, TaggedMessage};
use toolstream_test_utils::fake_process::FailingStream;

fn drain(rx: &mut mpsc::UnboundedReceiver<TaggedMessage>) -> Vec<TaggedMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

#[tokio::test]
async fn pump_enqueues_lines_with_newlines_and_trailing_fragment() -> anyhow::Result<()> {
    init_tracing();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let input: &[u8] = b"first\nsecond\nno newline";

    let stats = pump_stream(input, tx, Tag::Normal).await?;

    assert_eq!(
        drain(&mut rx),
        vec![
            TaggedMessage::new(Tag::Normal, "first\n"),
            TaggedMessage::new(Tag::Normal, "second\n"),
            TaggedMessage::new(Tag::Normal, "no newline"),
        ]
    );
    assert_eq!(
        stats,
        PumpStats {
            messages: 3,
            bytes: input.len()
        }
    );
    Ok(())
}

#[tokio::test]
async fn pump_tags_every_message_with_its_stream_tag() -> anyhow::Result<()> {
    init_tracing();

    let (tx, mut rx) = mpsc::unbounded_channel();
    pump_stream(&b"warning: low memory\nerror: abort\n"[..], tx, Tag::Error).await?;

    let msgs = drain(&mut rx);
    assert_eq!(msgs.len(), 2);
    assert!(msgs.iter().all(|m| m.tag == Tag::Error));
    Ok(())
}

#[tokio::test]
async fn pump_replaces_invalid_utf8_instead_of_failing() -> anyhow::Result<()> {
    init_tracing();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let input: &[u8] = b"ok \xff\xfe bytes\n";
    pump_stream(input, tx, Tag::Normal).await?;

    let msgs = drain(&mut rx);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].text.starts_with("ok "));
    assert!(msgs[0].text.contains('\u{FFFD}'));
    assert!(msgs[0].text.ends_with(" bytes\n"));
    Ok(())
}

#[tokio::test]
async fn pump_stops_quietly_when_nobody_consumes() -> anyhow::Result<()> {
    init_tracing();

    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);

    let stats = pump_stream(&b"a\nb\nc\n"[..], tx, Tag::Normal).await?;
    assert_eq!(stats.messages, 0);
    Ok(())
}

#[tokio::test]
async fn pump_finishes_when_the_writer_closes_the_stream() {
    init_tracing();

    let (mut writer, reader) = tokio::io::duplex(1024);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = spawn_pump("duplex-pump", reader, tx, Tag::Normal);

    writer.write_all(b"progress 10%\nprogress 20%\n").await.unwrap();
    drop(writer);

    let stats = common::with_timeout(handle.join()).await.unwrap();
    assert_eq!(stats.messages, 2);

    let texts: Vec<String> = drain(&mut rx).into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["progress 10%\n", "progress 20%\n"]);
}

#[tokio::test]
async fn read_error_surfaces_through_the_task_handle() {
    init_tracing();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let stream = FailingStream::new("before failure\n", "device unplugged");

    let handle = spawn_pump("failing-pump", stream, tx, Tag::Error);

    match common::with_timeout(handle.join()).await {
        Err(TaskError::Failed(err)) => {
            let msg = format!("{err:#}");
            assert!(msg.contains("device unplugged"), "unexpected error: {msg}");
        }
        other => panic!("expected TaskError::Failed, got {other:?}"),
    }

    // Data read before the failure is still delivered.
    let msgs = drain(&mut rx);
    assert_eq!(msgs, vec![TaggedMessage::new(Tag::Error, "before failure\n")]);
}
