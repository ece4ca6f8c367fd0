//! Result page: render the workflow summary to HTML and hand it to the
//! first browser that asks, then shut down.

use anyhow::{Context, Result};
use pulldown_cmark::{html, Parser};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::info;

/// Render the markdown summary into a standalone HTML page.
pub fn render_page(title: &str, summary: &str) -> String {
    let mut body = String::new();
    html::push_html(&mut body, Parser::new(summary));
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <style>body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }} \
         pre {{ background: #f4f4f4; padding: 1rem; overflow-x: auto; }}</style>\n\
         </head>\n<body>\n{body}</body>\n</html>\n"
    )
}

pub struct ReportServer {
    listener: TcpListener,
}

impl ReportServer {
    /// Bind on loopback. Port 0 picks a free one.
    pub async fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind report server on {}", addr))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("report server has no local address")
    }

    /// Serve the page to the first connection, then return. One response is
    /// all a single workflow run needs.
    pub async fn serve_once(self, page: &str) -> Result<()> {
        let addr = self.local_addr()?;
        info!("Result page at http://{}/ (serving one request)", addr);

        let (mut stream, peer) = self
            .listener
            .accept()
            .await
            .context("failed to accept report connection")?;
        info!("Serving result page to {}", peer);

        // Drain the request line and headers; the response is the same for
        // any path.
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf).await;

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            page.len(),
            page
        );
        stream
            .write_all(response.as_bytes())
            .await
            .context("failed to write result page")?;
        stream.shutdown().await.ok();
        Ok(())
    }
}
