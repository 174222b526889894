//! `harplay record` command.

use http::header::{HeaderName, HeaderValue};
use http::{Method, Uri};

use super::push_header_deletions;
use crate::adapters::live::LiveTransport;
use crate::adapters::recording::RecordingTransport;
use crate::cassette::recorder::HarRecorder;
use crate::cli::RecordArgs;
use crate::filter::FilterChain;
use crate::message::Request;
use crate::ports::Transport;

/// Execute the `record` command.
///
/// Sends the request live, prints the response body to stdout, and writes the
/// exchange to the output HAR file.
///
/// # Errors
///
/// Returns an error string if the request is malformed, fails, or the HAR file
/// cannot be written.
pub fn run(args: &RecordArgs) -> Result<(), String> {
    let mut request = build_request(args)?;
    let mut filters = FilterChain::new();
    push_header_deletions(&mut filters, &args.delete_headers)?;

    let transport = RecordingTransport::new(LiveTransport::new(), HarRecorder::new(&args.output, "harplay"))
        .with_filters(filters);
    let response = transport.round_trip(&mut request).map_err(|e| e.to_string())?;

    eprintln!("{} {}", response.status.as_u16(), response.status_text);
    println!("{}", response.text());

    let path = transport.finish().map_err(|e| e.to_string())?;
    eprintln!("Recording saved to: {}", path.display());
    Ok(())
}

fn build_request(args: &RecordArgs) -> Result<Request, String> {
    let method = Method::from_bytes(args.method.as_bytes())
        .map_err(|e| format!("Invalid method {:?}: {e}", args.method))?;
    let uri: Uri = args.url.parse().map_err(|e| format!("Invalid URL {:?}: {e}", args.url))?;
    let mut request = Request::new(method, uri);
    for header in &args.headers {
        let (name, value) =
            header.split_once(':').ok_or_else(|| format!("Header {header:?} is not `Name: value`"))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| format!("Invalid header name {name:?}: {e}"))?;
        let value = HeaderValue::from_str(value.trim()).map_err(|e| format!("Invalid header value {value:?}: {e}"))?;
        request.headers.append(name, value);
    }
    if let Some(data) = &args.data {
        request.body = data.clone().into();
    }
    Ok(request)
}
