//! `sgrid serve`: one JSON tool call per stdin line, one response per
//! stdout line.

use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use salesgrid_protocol::{parse_request_line, ErrorKind, ToolResponse, MAX_LINE_BYTES};
use salesgrid_recon::Session;

use crate::inputs::{load_all, read_mapping, Context};
use crate::CliError;

pub fn cmd_serve(ctx: &Context, load: Vec<PathBuf>, mapping: Option<PathBuf>) -> Result<(), CliError> {
    let rules = ctx.rules()?;
    let mapping = match ctx.mapping_path(mapping) {
        Some(path) => Some(read_mapping(&path, &rules)?),
        None => None,
    };

    let mut session = Session::new(rules).with_preview_rows(ctx.preview_rows(None));
    if let Some(mapping) = mapping {
        session = session.with_mapping(mapping);
    }
    let loaded = load_all(session.registry_mut(), &load)?;
    log::info!("serve: {} sheet(s) loaded, waiting for requests", loaded.len());

    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_lines(&mut session, stdin.lock(), stdout.lock())
        .map_err(|e| CliError::io(format!("serve: {e}")))
}

enum Frame {
    Eof,
    Line,
    TooLong,
}

/// Read one newline-terminated line into `buf`, storing at most
/// `MAX_LINE_BYTES + 1` bytes. The rest of an oversized line is consumed
/// and dropped so the next read starts on a fresh line.
fn next_frame<R: BufRead>(input: &mut R, buf: &mut Vec<u8>) -> io::Result<Frame> {
    buf.clear();
    let limit = MAX_LINE_BYTES as u64 + 1;
    let n = input.by_ref().take(limit).read_until(b'\n', buf)?;
    if n == 0 {
        return Ok(Frame::Eof);
    }
    if buf.last() == Some(&b'\n') || (n as u64) < limit {
        return Ok(Frame::Line);
    }
    loop {
        let available = input.fill_buf()?;
        if available.is_empty() {
            break;
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(i) => {
                input.consume(i + 1);
                break;
            }
            None => {
                let len = available.len();
                input.consume(len);
            }
        }
    }
    Ok(Frame::TooLong)
}

/// Answer requests until EOF. Malformed, oversized or non-UTF-8 lines get a
/// `protocol` error response; nothing read from the input ends the loop early.
pub fn serve_lines<R: BufRead, W: Write>(session: &mut Session, mut input: R, mut output: W) -> io::Result<()> {
    let mut buf = Vec::new();
    let mut handled = 0usize;
    loop {
        let parsed = match next_frame(&mut input, &mut buf)? {
            Frame::Eof => break,
            Frame::TooLong => Err(format!("request line exceeds limit of {MAX_LINE_BYTES} bytes")),
            Frame::Line => match std::str::from_utf8(buf.strip_suffix(b"\n").unwrap_or(&buf[..])) {
                Ok(line) => parse_request_line(line),
                Err(_) => Err("request line is not valid UTF-8".to_string()),
            },
        };
        let response = match parsed {
            Ok(None) => continue,
            Ok(Some(request)) => session.handle(request),
            Err(message) => {
                log::warn!("serve: {message}");
                ToolResponse::failure(None, ErrorKind::Protocol, message)
            }
        };
        writeln!(output, "{}", response.to_line())?;
        output.flush()?;
        handled += 1;
    }
    log::info!("serve: answered {handled} request(s)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesgrid_recon::{Cell, Dataset};
    use serde_json::Value;

    fn run(session: &mut Session, input: &str) -> Vec<Value> {
        run_bytes(session, input.as_bytes())
    }

    fn run_bytes(session: &mut Session, input: &[u8]) -> Vec<Value> {
        let mut out = Vec::new();
        serve_lines(session, input, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn one_response_per_request_line() {
        let mut session = Session::default();
        let ds = Dataset::new(vec!["a".into()], vec![vec![Cell::Number(1.0)]]).unwrap();
        session.registry_mut().insert_sheet("f.csv", "f", ds).unwrap();

        let input = concat!(
            r#"{"id":"1","tool":"list_datasets","arguments":{}}"#,
            "\n\n",
            r#"{"id":"2","tool":"preview_dataset","arguments":{"key":"nope::x"}}"#,
            "\n",
        );
        let responses = run(&mut session, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], "1");
        assert_eq!(responses[0]["result"]["count"], 1);
        assert_eq!(responses[1]["id"], "2");
        assert_eq!(responses[1]["error_kind"], "not_found");
    }

    #[test]
    fn malformed_line_does_not_stop_the_loop() {
        let mut session = Session::default();
        let input = "{not json\n{\"tool\":\"list_datasets\"}\n";
        let responses = run(&mut session, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error_kind"], "protocol");
        assert_eq!(responses[1]["result"]["count"], 0);
    }

    #[test]
    fn oversized_line_is_rejected_and_skipped() {
        let mut session = Session::default();
        let mut input = "x".repeat(MAX_LINE_BYTES + 10);
        input.push('\n');
        input.push_str("{\"id\":\"after\",\"tool\":\"list_datasets\"}\n");
        let responses = run(&mut session, &input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error_kind"], "protocol");
        assert_eq!(responses[1]["id"], "after");
        assert_eq!(responses[1]["result"]["count"], 0);
    }

    #[test]
    fn oversized_line_at_eof_is_rejected() {
        let mut session = Session::default();
        let input = "y".repeat(MAX_LINE_BYTES * 2);
        let responses = run(&mut session, &input);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["error_kind"], "protocol");
    }

    #[test]
    fn line_at_limit_is_accepted() {
        let mut session = Session::default();
        let request = "{\"id\":\"big\",\"tool\":\"list_datasets\"}";
        let mut input = request.to_string();
        input.push_str(&" ".repeat(MAX_LINE_BYTES - request.len()));
        input.push('\n');
        let responses = run(&mut session, &input);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], "big");
    }

    #[test]
    fn invalid_utf8_is_a_protocol_error() {
        let mut session = Session::default();
        let input = b"{\"tool\":\"list\xffdatasets\"}\n{\"id\":\"2\",\"tool\":\"list_datasets\"}\n";
        let responses = run_bytes(&mut session, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error_kind"], "protocol");
        assert!(responses[0]["error"].as_str().unwrap().contains("UTF-8"));
        assert_eq!(responses[1]["id"], "2");
    }
}
