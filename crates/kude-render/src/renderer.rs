//! Strategy selection and dispatch.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use kude_config::{CliSettings, Config};
use kude_document::{DEFAULT_LOCALE, InvoiceDocument, RenderParameters, XmlSource};
use kude_external::{CancelToken, ExternalRenderer, ProcessInvoker, RendererCommand, SyncPolicy};
use kude_pdf::NativeRenderer;

use crate::RenderError;

/// How PDF bytes are produced.
#[derive(Debug)]
pub enum RenderStrategy {
    /// In-process rendering.
    Native(NativeRenderer),
    /// Delegation to an external renderer.
    External(ExternalRenderer),
}

impl RenderStrategy {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Native(_) => "native",
            Self::External(_) => "external",
        }
    }
}

/// A finished render.
#[derive(Debug)]
pub struct Rendered {
    /// Document model extracted from the XML.
    pub document: InvoiceDocument,
    /// PDF bytes.
    pub pdf: Vec<u8>,
}

/// Renders DE XML to KUDE PDF bytes.
///
/// Each call is independent: extract the document, dispatch to the strategy,
/// return the bytes. Failures are all-or-nothing and keep their original kind.
///
/// The report locale belongs to the renderer. Parameters passed to a render
/// call always leave with this renderer's locale, whatever they carried.
#[derive(Debug)]
pub struct Renderer {
    strategy: RenderStrategy,
    locale: String,
}

impl Renderer {
    /// Renderer with an explicit strategy and the default locale.
    #[must_use]
    pub fn new(strategy: RenderStrategy) -> Self {
        Self {
            strategy,
            locale: DEFAULT_LOCALE.to_owned(),
        }
    }

    /// Load configuration (see [`Config::load`]) and build from it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] if the configuration cannot be loaded.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, RenderError> {
        let config = Config::load(config_path, cli_settings)?;
        tracing::debug!(
            config = ?config.config_path,
            external = config.uses_external(),
            locale = %config.locale,
            "loaded configuration"
        );
        Ok(Self::from_config(&config))
    }

    /// Build from configuration.
    ///
    /// The external strategy is selected when an external template root is
    /// configured, the native one otherwise.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let strategy = match &config.external_resolved {
            Some(external) => {
                let mut command =
                    RendererCommand::new(&external.executable).jvm_args(external.jvm_args.clone());
                if let Some(class_path) = &external.class_path {
                    command = command.class_path(class_path);
                }
                if let Some(jar) = &external.jar {
                    command = command.jar(jar);
                }
                let mut renderer = ExternalRenderer::new(command, &external.template_dir)
                    .invoker(Arc::new(ProcessInvoker::new(external.timeout)))
                    .sync_policy(SyncPolicy {
                        attempts: config.sync.attempts,
                        initial_delay: config.sync.initial_delay(),
                        retry_delay: config.sync.retry_delay(),
                        extension: config.sync.extension.clone(),
                    });
                if let Some(work_dir) = &external.work_dir {
                    renderer = renderer.work_dir(work_dir);
                }
                RenderStrategy::External(renderer)
            }
            None => RenderStrategy::Native(
                NativeRenderer::new().include_parameters(config.native.include_parameters),
            ),
        };
        Self::new(strategy).with_locale(&config.locale)
    }

    /// Set the report locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Active strategy.
    #[must_use]
    pub fn strategy(&self) -> &RenderStrategy {
        &self.strategy
    }

    /// Fresh parameters carrying this renderer's locale, ready for caller merges.
    #[must_use]
    pub fn parameters(&self) -> RenderParameters {
        RenderParameters::new(&self.locale)
    }

    /// Render `xml` to PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns the failing component's error wrapped in [`RenderError`];
    /// use [`RenderError::kind`] to classify it.
    pub fn render(
        &self,
        xml: &XmlSource,
        params: &RenderParameters,
    ) -> Result<Vec<u8>, RenderError> {
        self.render_document(xml, params).map(|rendered| rendered.pdf)
    }

    /// Render `xml`, returning the extracted document alongside the PDF.
    ///
    /// # Errors
    ///
    /// Same as [`Renderer::render`].
    pub fn render_document(
        &self,
        xml: &XmlSource,
        params: &RenderParameters,
    ) -> Result<Rendered, RenderError> {
        self.render_cancellable(xml, params, &CancelToken::new())
    }

    /// Render `xml`, stopping early once `cancel` fires.
    ///
    /// A cancelled external render removes its workspace before returning.
    ///
    /// # Errors
    ///
    /// Same as [`Renderer::render`], plus a [`RenderErrorKind::Cancelled`]
    /// error after cancellation.
    ///
    /// [`RenderErrorKind::Cancelled`]: crate::RenderErrorKind::Cancelled
    pub fn render_cancellable(
        &self,
        xml: &XmlSource,
        params: &RenderParameters,
        cancel: &CancelToken,
    ) -> Result<Rendered, RenderError> {
        let document = InvoiceDocument::from_source(xml)?;
        let params = self.localize(params);
        tracing::debug!(
            strategy = self.strategy.name(),
            template = document.document_type().template_id(),
            document_number = document.document_number(),
            "rendering KUDE"
        );

        let pdf = match &self.strategy {
            RenderStrategy::Native(native) => native.render(&document, &params),
            RenderStrategy::External(external) => {
                external.render_cancellable(xml, &document, &params, cancel)?
            }
        };
        Ok(Rendered { document, pdf })
    }

    fn localize<'a>(&self, params: &'a RenderParameters) -> Cow<'a, RenderParameters> {
        if params.locale() == self.locale {
            return Cow::Borrowed(params);
        }
        tracing::debug!(
            requested = params.locale(),
            locale = %self.locale,
            "applying renderer locale to parameters"
        );
        Cow::Owned(params.clone().with_locale(&self.locale))
    }
}
