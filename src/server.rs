//! MCP server exposing `convert_pdf_page_to_markdown` over stdio.
//!
//! stdout carries the protocol, so nothing in this process may print to it;
//! logs go to stderr (configured by the binary).
//!
//! Tool failures are reported inside the tool result (`isError: true`) rather
//! than as protocol errors, so the calling model sees the cause and can
//! correct its arguments, e.g. retry with a page number within range.

use crate::backend;
use crate::config::{RasterConfig, VisionConfig};
use crate::error::ToolError;
use crate::pipeline::geometry::PageNumber;
use crate::pipeline::input::{self, PathPolicy};
use crate::pipeline::vision::VisionClient;
use crate::pipeline::{postprocess, render};
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Name the server reports in its `initialize` response.
pub const SERVER_NAME: &str = "pdf-to-markdown-mcp";

/// Prefix of every tool error message.
pub const ERROR_PREFIX: &str = "Error converting PDF page to markdown";

/// Arguments of `convert_pdf_page_to_markdown`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ConvertPageParams {
    /// Absolute path to the PDF file
    pub pdf_path: String,
    /// Page number to convert (1-indexed)
    pub page_number: f64,
}

#[derive(Clone)]
pub struct Pdf2MdServer {
    raster: Arc<RasterConfig>,
    vision: VisionClient,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl Pdf2MdServer {
    pub fn new(raster: RasterConfig, vision: VisionClient) -> Self {
        Self {
            raster: Arc::new(raster),
            vision,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Convert a specific page of a PDF file to markdown using the Qwen vision model. \
The page is rendered to a PNG image and transcribed, preserving text, tables and structure."
    )]
    async fn convert_pdf_page_to_markdown(
        &self,
        Parameters(params): Parameters<ConvertPageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.convert(&params).await {
            Ok(markdown) => Ok(CallToolResult::success(vec![Content::text(markdown)])),
            Err(e) => {
                warn!(
                    error = %e,
                    pdf_path = %params.pdf_path,
                    "convert_pdf_page_to_markdown failed"
                );
                Ok(CallToolResult::error(vec![Content::text(format!(
                    "{ERROR_PREFIX}: {e}"
                ))]))
            }
        }
    }
}

impl Pdf2MdServer {
    /// Validate arguments in order (path, page number, file), then render and
    /// transcribe.
    async fn convert(&self, params: &ConvertPageParams) -> Result<String, ToolError> {
        let path = input::check_path(&params.pdf_path, PathPolicy::RequireAbsolute)?;
        let page = PageNumber::try_from(params.page_number)?;
        let bytes = input::read_pdf(&path).await?;

        info!("Converting {} page {}", path.display(), page);
        let png = render::rasterize_page(bytes, i64::from(page.get()), &self.raster).await?;
        let raw = self.vision.transcribe(&png).await?;
        Ok(postprocess::clean_markdown(&raw))
    }
}

#[tool_handler]
impl ServerHandler for Pdf2MdServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = SERVER_NAME.into();
        server_info.version = env!("CARGO_PKG_VERSION").into();

        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info,
            instructions: Some(
                "Converts one page of a local PDF to markdown. Pass an absolute pdf_path \
                 and a 1-indexed page_number."
                    .into(),
            ),
            ..Default::default()
        }
    }
}

/// Serve the tool on stdin/stdout until the client disconnects.
///
/// The pdfium backend is initialised up front so a missing library shows up
/// in the logs at startup; a failure is not fatal, each call reports it.
pub async fn run_stdio(raster: RasterConfig, vision: VisionConfig) -> Result<(), ToolError> {
    if let Err(e) = backend::init(raster.pdfium_library.as_deref()) {
        warn!("{}", e);
    }

    let server = Pdf2MdServer::new(raster, VisionClient::new(vision)?);
    info!("{} ready on stdio", SERVER_NAME);

    let service = server
        .serve(rmcp::transport::io::stdio())
        .await
        .map_err(|e| ToolError::Server(e.to_string()))?;
    let reason = service
        .waiting()
        .await
        .map_err(|e| ToolError::Server(e.to_string()))?;
    info!("MCP session ended: {:?}", reason);
    Ok(())
}
