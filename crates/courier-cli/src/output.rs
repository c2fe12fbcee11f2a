//! Response printing.

use courier_http::{format_response_head, Response};
use futures_util::StreamExt;
use tokio::io::{self, AsyncWrite, AsyncWriteExt};

use crate::error::CliError;

/// Write the response to stdout, streaming the body.
pub async fn write_response(response: Response, include_head: bool) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    write_to(&mut stdout, response, include_head).await
}

/// Write the response to `out`: the head when asked for, then the body.
pub async fn write_to<W>(out: &mut W, response: Response, include_head: bool) -> Result<(), CliError>
where
    W: AsyncWrite + Unpin,
{
    if include_head {
        out.write_all(format_head(&response).as_bytes())
            .await
            .map_err(stdout_error)?;
    }

    let mut body = response.into_stream();
    while let Some(chunk) = body.next().await {
        out.write_all(&chunk?).await.map_err(stdout_error)?;
    }
    out.flush().await.map_err(stdout_error)
}

/// Status line and headers, terminated by a blank line.
pub fn format_head(response: &Response) -> String {
    format_response_head(response.version(), response.status(), response.headers())
}

fn stdout_error(e: std::io::Error) -> CliError {
    CliError::io("failed to write response", e, None)
}
