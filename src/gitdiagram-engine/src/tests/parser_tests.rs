use bytes::Bytes;
use futures::{StreamExt, stream};
use pretty_assertions::assert_eq;

use gitdiagram_protocol::{Artifact, Frame, Phase, StreamMessage};

use crate::error::{DiagramError, Result};
use crate::machine::{PhaseMachine, Transition};
use crate::parser::{FrameDecoder, frames};
use crate::transport::ByteStream;

fn explanation_chunk(text: &str) -> Frame {
    Frame::Chunk {
        artifact: Artifact::Explanation,
        chunk: text.to_string(),
    }
}

fn byte_stream(items: Vec<Result<&'static str>>) -> ByteStream {
    let items: Vec<Result<Bytes>> = items
        .into_iter()
        .map(|item| item.map(|s| Bytes::from_static(s.as_bytes())))
        .collect();
    Box::pin(stream::iter(items))
}

#[test]
fn test_decodes_data_lines() {
    let mut decoder = FrameDecoder::new();
    let input = StreamMessage::progress(Phase::Started, "go").to_data_line()
        + &StreamMessage::chunk(Artifact::Explanation, "abc").to_data_line();

    let frames = decoder.feed(input.as_bytes());
    assert_eq!(
        frames,
        vec![
            Frame::Progress {
                phase: Phase::Started,
                message: Some("go".to_string()),
            },
            explanation_chunk("abc"),
        ]
    );
    assert_eq!(decoder.pending_len(), 0);
}

#[test]
fn test_partial_lines_wait_for_newline() {
    let mut decoder = FrameDecoder::new();
    let line = StreamMessage::chunk(Artifact::Explanation, "hello").to_data_line();
    let (head, tail) = line.split_at(17);

    assert!(decoder.feed(head.as_bytes()).is_empty());
    assert_eq!(decoder.pending_len(), head.len());
    assert_eq!(decoder.feed(tail.as_bytes()), vec![explanation_chunk("hello")]);
    assert_eq!(decoder.skipped(), 0);
}

#[test]
fn test_split_inside_multibyte_character() {
    let mut decoder = FrameDecoder::new();
    let line = StreamMessage::chunk(Artifact::Explanation, "héllo").to_data_line();
    let bytes = line.as_bytes();
    let split = line.find('é').unwrap() + 1;

    assert!(decoder.feed(&bytes[..split]).is_empty());
    assert_eq!(decoder.feed(&bytes[split..]), vec![explanation_chunk("héllo")]);
}

#[test]
fn test_malformed_line_is_skipped() {
    let mut decoder = FrameDecoder::new();
    let input = format!(
        "{}data: {{not json\n\n{}",
        StreamMessage::chunk(Artifact::Explanation, "a").to_data_line(),
        StreamMessage::chunk(Artifact::Explanation, "b").to_data_line(),
    );

    let frames = decoder.feed(input.as_bytes());
    assert_eq!(frames, vec![explanation_chunk("a"), explanation_chunk("b")]);
    assert_eq!(decoder.skipped(), 1);
}

#[test]
fn test_records_without_status_are_skipped() {
    let mut decoder = FrameDecoder::new();
    let frames = decoder.feed(b"data: {\"message\":\"hi\"}\n");
    assert!(frames.is_empty());
    assert_eq!(decoder.skipped(), 1);
}

#[test]
fn test_ignores_non_data_lines() {
    let mut decoder = FrameDecoder::new();
    let input = ": keep-alive\nevent: message\nid: 7\n\ndata:\ndata: {\"status\":\"mapping\"}\r\n";
    let frames = decoder.feed(input.as_bytes());
    assert_eq!(
        frames,
        vec![Frame::Progress {
            phase: Phase::Mapping,
            message: None,
        }]
    );
    assert_eq!(decoder.skipped(), 0);
}

#[test]
fn test_marker_without_space() {
    let mut decoder = FrameDecoder::new();
    let frames = decoder.feed(b"data:{\"status\":\"complete\",\"diagram\":\"graph\"}\n");
    assert_eq!(
        frames,
        vec![Frame::Complete {
            diagram: Some("graph".to_string()),
            explanation: None,
            mapping: None,
        }]
    );
}

#[test]
fn test_error_field_wins() {
    let mut decoder = FrameDecoder::new();
    let frames = decoder.feed(b"data: {\"status\":\"diagram_chunk\",\"chunk\":\"x\",\"error\":\"boom\"}\n");
    assert_eq!(
        frames,
        vec![Frame::Error {
            message: "boom".to_string(),
        }]
    );
}

#[test]
fn test_finish_decodes_unterminated_line() {
    let mut decoder = FrameDecoder::new();
    assert!(decoder.feed(b"data: {\"status\":\"started\"}").is_empty());
    assert_eq!(
        decoder.finish(),
        Some(Frame::Progress {
            phase: Phase::Started,
            message: None,
        })
    );
    assert_eq!(decoder.finish(), None);
}

#[tokio::test]
async fn test_frames_across_chunk_boundaries() {
    let bytes = byte_stream(vec![
        Ok("data: {\"status\":\"explanation_chunk\",\"ch"),
        Ok("unk\":\"a\"}\n\ndata: garbage\n"),
        Ok("data: {\"status\":\"explanation_chunk\",\"chunk\":\"b\"}\n"),
    ]);

    let received: Vec<Frame> = frames(bytes).map(|f| f.unwrap()).collect().await;
    assert_eq!(received, vec![explanation_chunk("a"), explanation_chunk("b")]);
}

#[tokio::test]
async fn test_frames_stop_after_transport_error() {
    let bytes = byte_stream(vec![
        Ok("data: {\"status\":\"explanation_chunk\",\"chunk\":\"a\"}\n"),
        Ok("data: {\"status\":\"explanation_chunk\",\"chunk\":\"half"),
        Err(DiagramError::StreamRead("connection reset".to_string())),
        Ok("data: {\"status\":\"explanation_chunk\",\"chunk\":\"b\"}\n"),
    ]);

    let received: Vec<Result<Frame>> = frames(bytes).collect().await;
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].as_ref().unwrap(), &explanation_chunk("a"));
    assert!(matches!(received[1], Err(DiagramError::StreamRead(_))));
}

#[test]
fn test_wire_records_drive_machine() {
    let mut decoder = FrameDecoder::new();
    let frames = decoder.feed(
        concat!(
            "data: {\"status\":\"diagram_chunk\",\"chunk\":\"A\"}\r\n",
            "data: {\"status\":\"explanation\",\"message\":\"late\"}\n",
            "data: {\"status\":\"complete\",\"error\":\"\"}\n",
            "data: {\"status\":\"diagram_chunk\",\"chunk\":\"B\"}\n",
        )
        .as_bytes(),
    );
    assert_eq!(frames.len(), 4);
    assert_eq!(decoder.skipped(), 0);

    let mut machine = PhaseMachine::new();
    let transitions: Vec<Transition> = frames.into_iter().map(|f| machine.apply(f)).collect();

    assert_eq!(transitions[2], Transition::Completed);
    assert_eq!(transitions[3], Transition::Ignored);
    let state = machine.state();
    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.final_diagram.as_deref(), Some("A"));
    assert_eq!(state.diagram_text.as_str(), "A");
    assert_eq!(state.error_message, None);
}
