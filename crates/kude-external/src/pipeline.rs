//! External rendering pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kude_document::{InvoiceDocument, RenderParameters, XmlSource};

use crate::{
    CancelToken, ExternalError, ExternalRenderRequest, ProcessInvoker, RenderInvoker,
    RendererCommand, ResultSynchronizer, SyncPolicy, Workspace,
};

/// Renders KUDE PDFs by delegating to an external renderer.
///
/// Each call runs strictly in sequence: create workspace, validate arguments,
/// invoke, synchronize. The workspace is removed on every path, including
/// validation failures that never launch the renderer.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use kude_external::{ExternalRenderer, ProcessInvoker, RendererCommand, SyncPolicy};
///
/// let renderer = ExternalRenderer::new(RendererCommand::new("java"), "/opt/kude/templates")
///     .work_dir("/var/tmp/kude")
///     .invoker(Arc::new(ProcessInvoker::new(Duration::from_secs(60))))
///     .sync_policy(SyncPolicy::default());
/// ```
pub struct ExternalRenderer {
    command: RendererCommand,
    template_dir: PathBuf,
    work_dir: Option<PathBuf>,
    invoker: Arc<dyn RenderInvoker>,
    synchronizer: ResultSynchronizer,
}

impl ExternalRenderer {
    /// Create a renderer using [`ProcessInvoker`] and the default [`SyncPolicy`].
    #[must_use]
    pub fn new(command: RendererCommand, template_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            template_dir: template_dir.into(),
            work_dir: None,
            invoker: Arc::new(ProcessInvoker::default()),
            synchronizer: ResultSynchronizer::default(),
        }
    }

    /// Parent directory for temporary workspaces (default: OS temp dir).
    #[must_use]
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Replace the invoker.
    #[must_use]
    pub fn invoker(mut self, invoker: Arc<dyn RenderInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    /// Replace the synchronization policy.
    #[must_use]
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.synchronizer = ResultSynchronizer::new(policy);
        self
    }

    /// Template root.
    #[must_use]
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Render `doc` (parsed from `source`) with the external renderer.
    ///
    /// # Errors
    ///
    /// - [`ExternalError::InvalidArgument`] if a path argument contains whitespace
    ///   or the template file is missing; the renderer is not launched
    /// - [`ExternalError::Spawn`], [`ExternalError::TimedOut`] or
    ///   [`ExternalError::ProcessFailed`] if the renderer did not exit cleanly
    /// - [`ExternalError::ArtifactNotProduced`] or [`ExternalError::ArtifactUnreadable`]
    ///   if the artifact could not be collected
    /// - [`ExternalError::Workspace`] if the workspace could not be prepared
    pub fn render(
        &self,
        source: &XmlSource,
        doc: &InvoiceDocument,
        params: &RenderParameters,
    ) -> Result<Vec<u8>, ExternalError> {
        self.render_cancellable(source, doc, params, &CancelToken::new())
    }

    /// [`render`](Self::render) that stops early once `cancel` fires.
    ///
    /// The workspace is removed before [`ExternalError::Cancelled`] is returned.
    ///
    /// # Errors
    ///
    /// As [`render`](Self::render), plus [`ExternalError::Cancelled`].
    pub fn render_cancellable(
        &self,
        source: &XmlSource,
        doc: &InvoiceDocument,
        params: &RenderParameters,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, ExternalError> {
        let workspace = match &self.work_dir {
            Some(dir) => Workspace::create_in(dir)?,
            None => Workspace::create()?,
        };
        let xml_path = match source {
            XmlSource::Path(path) => path.clone(),
            XmlSource::Inline(xml) => workspace.write_input(xml)?,
        };
        let request = ExternalRenderRequest::new(
            self.command.clone(),
            xml_path,
            self.template_dir.clone(),
            workspace.output_dir(),
            params.to_json(),
        );
        request.validate()?;
        self.check_template(doc)?;

        let output = self.invoker.invoke(&request, cancel)?;
        output.check_status()?;

        let pdf = self
            .synchronizer
            .collect_cancellable(workspace, &output, cancel)?;
        tracing::info!(
            document_type = doc.document_type().code(),
            bytes = pdf.len(),
            "rendered KUDE with external renderer"
        );
        Ok(pdf)
    }

    fn check_template(&self, doc: &InvoiceDocument) -> Result<(), ExternalError> {
        let template = self
            .template_dir
            .join(doc.document_type().template_file_name());
        if template.is_file() {
            return Ok(());
        }
        Err(ExternalError::InvalidArgument {
            argument: "template",
            value: template.to_string_lossy().into_owned(),
            reason: "template file not found",
        })
    }
}

impl fmt::Debug for ExternalRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalRenderer")
            .field("command", &self.command)
            .field("template_dir", &self.template_dir)
            .field("work_dir", &self.work_dir)
            .field("synchronizer", &self.synchronizer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockInvoker;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rDE><DE><gTimb><iTiDE>1</iTiDE><dDesTiDE>Factura electrónica</dDesTiDE>
<dNumTim>12345678</dNumTim><dEst>001</dEst><dPunExp>002</dPunExp>
<dNumDoc>0000123</dNumDoc></gTimb></DE></rDE>"#;

    struct Fixture {
        _root: TempDir,
        templates: PathBuf,
        work: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let templates = root.path().join("templates");
            let work = root.path().join("work");
            fs::create_dir(&templates).unwrap();
            fs::create_dir(&work).unwrap();
            fs::write(templates.join("Factura.jasper"), b"").unwrap();
            Self {
                _root: root,
                templates,
                work,
            }
        }

        fn renderer(&self, invoker: &Arc<MockInvoker>) -> ExternalRenderer {
            ExternalRenderer::new(RendererCommand::new("renderer"), &self.templates)
                .work_dir(&self.work)
                .invoker(Arc::clone(invoker) as Arc<dyn RenderInvoker>)
                .sync_policy(SyncPolicy {
                    attempts: 3,
                    initial_delay: Duration::from_millis(10),
                    retry_delay: Duration::from_millis(40),
                    ..SyncPolicy::default()
                })
        }

        fn workspaces_left(&self) -> usize {
            fs::read_dir(&self.work).unwrap().count()
        }
    }

    fn render(renderer: &ExternalRenderer, source: &XmlSource) -> Result<Vec<u8>, ExternalError> {
        let doc = InvoiceDocument::from_source(source).unwrap();
        renderer.render(source, &doc, &RenderParameters::default())
    }

    #[test]
    fn test_render_returns_artifact_and_cleans_up() {
        let fixture = Fixture::new();
        let invoker = Arc::new(MockInvoker::writes("output.pdf", b"%PDF-1.7 mock".to_vec()));

        let pdf = render(&fixture.renderer(&invoker), &XmlSource::Inline(XML.to_owned())).unwrap();

        assert_eq!(pdf, b"%PDF-1.7 mock");
        assert_eq!(invoker.calls(), 1);
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[test]
    fn test_render_passes_materialized_xml_and_locale() {
        let fixture = Fixture::new();
        let invoker = Arc::new(MockInvoker::writes("output.pdf", b"%PDF".to_vec()));

        render(&fixture.renderer(&invoker), &XmlSource::Inline(XML.to_owned())).unwrap();

        let request = &invoker.requests()[0];
        assert!(request.xml_path().ends_with("de.xml"));
        assert!(request.output_dir().starts_with(&fixture.work));
        assert_eq!(request.template_dir(), fixture.templates);
        assert_eq!(request.parameters_json(), r#"{"REPORT_LOCALE":"es_PY"}"#);
    }

    #[test]
    fn test_render_found_after_delayed_write() {
        let fixture = Fixture::new();
        let invoker = Arc::new(MockInvoker::writes_after(
            "output.pdf",
            b"%PDF late".to_vec(),
            Duration::from_millis(30),
        ));

        let pdf = render(&fixture.renderer(&invoker), &XmlSource::Inline(XML.to_owned())).unwrap();
        assert_eq!(pdf, b"%PDF late");
    }

    #[test]
    fn test_render_process_failure_cleans_up() {
        let fixture = Fixture::new();
        let invoker = Arc::new(MockInvoker::exits_with(1, "Exception in thread main"));

        let err = render(&fixture.renderer(&invoker), &XmlSource::Inline(XML.to_owned()))
            .unwrap_err();

        match err {
            ExternalError::ProcessFailed {
                exit_code,
                stderr_excerpt,
            } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr_excerpt, "Exception in thread main");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[test]
    fn test_render_exhausted_cleans_up() {
        let fixture = Fixture::new();
        let invoker = Arc::new(MockInvoker::succeeds().with_stdout("nothing written"));

        let err = render(&fixture.renderer(&invoker), &XmlSource::Inline(XML.to_owned()))
            .unwrap_err();

        match err {
            ExternalError::ArtifactNotProduced {
                attempts, stdout, ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(stdout, "nothing written");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[test]
    fn test_whitespace_in_xml_path_never_invokes() {
        let fixture = Fixture::new();
        let dir = fixture.work.parent().unwrap().join("my docs");
        fs::create_dir(&dir).unwrap();
        let path = dir.join("de.xml");
        fs::write(&path, XML).unwrap();
        let invoker = Arc::new(MockInvoker::writes("output.pdf", b"%PDF".to_vec()));

        let err = render(&fixture.renderer(&invoker), &XmlSource::Path(path)).unwrap_err();

        assert!(matches!(
            err,
            ExternalError::InvalidArgument {
                argument: "XML path",
                ..
            }
        ));
        assert_eq!(invoker.calls(), 0);
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[test]
    fn test_whitespace_in_template_dir_never_invokes() {
        let fixture = Fixture::new();
        let templates = fixture.work.parent().unwrap().join("my templates");
        fs::create_dir(&templates).unwrap();
        fs::write(templates.join("Factura.jasper"), b"").unwrap();
        let invoker = Arc::new(MockInvoker::writes("output.pdf", b"%PDF".to_vec()));
        let renderer = ExternalRenderer::new(RendererCommand::new("renderer"), templates)
            .work_dir(&fixture.work)
            .invoker(Arc::clone(&invoker) as Arc<dyn RenderInvoker>);

        let err = render(&renderer, &XmlSource::Inline(XML.to_owned())).unwrap_err();

        assert!(matches!(
            err,
            ExternalError::InvalidArgument {
                argument: "template directory",
                ..
            }
        ));
        assert_eq!(invoker.calls(), 0);
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[test]
    fn test_missing_template_file_never_invokes() {
        let fixture = Fixture::new();
        fs::remove_file(fixture.templates.join("Factura.jasper")).unwrap();
        let invoker = Arc::new(MockInvoker::writes("output.pdf", b"%PDF".to_vec()));

        let err = render(&fixture.renderer(&invoker), &XmlSource::Inline(XML.to_owned()))
            .unwrap_err();

        match err {
            ExternalError::InvalidArgument { argument, value, .. } => {
                assert_eq!(argument, "template");
                assert!(value.ends_with("Factura.jasper"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(invoker.calls(), 0);
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[test]
    fn test_cancelled_while_polling_cleans_up() {
        let fixture = Fixture::new();
        let invoker = Arc::new(MockInvoker::succeeds());
        let renderer = fixture.renderer(&invoker).sync_policy(SyncPolicy {
            attempts: 50,
            initial_delay: Duration::from_millis(10),
            retry_delay: Duration::from_millis(500),
            ..SyncPolicy::default()
        });
        let source = XmlSource::Inline(XML.to_owned());
        let doc = InvoiceDocument::from_source(&source).unwrap();
        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let err = renderer
            .render_cancellable(&source, &doc, &RenderParameters::default(), &cancel)
            .unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, ExternalError::Cancelled));
        assert_eq!(fixture.workspaces_left(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_render_with_script_renderer() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = Fixture::new();
        let script = fixture.work.parent().unwrap().join("render.sh");
        // $3 is the output directory, passed with a trailing separator.
        fs::write(&script, "#!/bin/sh\nprintf '%%PDF script' > \"$3\"kude.pdf\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let renderer = ExternalRenderer::new(RendererCommand::new(&script), &fixture.templates)
            .work_dir(&fixture.work)
            .sync_policy(SyncPolicy {
                initial_delay: Duration::from_millis(10),
                retry_delay: Duration::from_millis(40),
                ..SyncPolicy::default()
            });

        let pdf = render(&renderer, &XmlSource::Inline(XML.to_owned())).unwrap();

        assert_eq!(pdf, b"%PDF script");
        assert_eq!(fixture.workspaces_left(), 0);
    }
}
