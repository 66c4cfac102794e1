//! External renderer command line.

use std::ffi::OsString;
use std::path::{MAIN_SEPARATOR, MAIN_SEPARATOR_STR, Path, PathBuf};

use crate::ExternalError;

/// How to start the external renderer, shared by all invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererCommand {
    executable: PathBuf,
    jvm_args: Vec<String>,
    class_path: Option<PathBuf>,
    jar: Option<PathBuf>,
}

impl RendererCommand {
    /// Run `executable` directly with the positional renderer arguments.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            jvm_args: Vec::new(),
            class_path: None,
            jar: None,
        }
    }

    /// Arguments placed before `-classpath`/`-jar` (e.g. `-Dfile.encoding=IBM850`).
    #[must_use]
    pub fn jvm_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jvm_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Class path passed with `-classpath`.
    #[must_use]
    pub fn class_path(mut self, class_path: impl Into<PathBuf>) -> Self {
        self.class_path = Some(class_path.into());
        self
    }

    /// Jar passed with `-jar`.
    #[must_use]
    pub fn jar(mut self, jar: impl Into<PathBuf>) -> Self {
        self.jar = Some(jar.into());
        self
    }

    /// Executable path.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

/// Arguments for one external render.
///
/// Built once per invocation and never mutated. The positional arguments
/// follow the renderer's contract, in order: XML path, template directory,
/// output directory, JSON parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRenderRequest {
    command: RendererCommand,
    xml_path: PathBuf,
    template_dir: PathBuf,
    output_dir: PathBuf,
    parameters_json: String,
}

impl ExternalRenderRequest {
    /// Create a request.
    #[must_use]
    pub fn new(
        command: RendererCommand,
        xml_path: impl Into<PathBuf>,
        template_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        parameters_json: impl Into<String>,
    ) -> Self {
        Self {
            command,
            xml_path: xml_path.into(),
            template_dir: template_dir.into(),
            output_dir: output_dir.into(),
            parameters_json: parameters_json.into(),
        }
    }

    /// Check the renderer's argument constraints without launching anything.
    ///
    /// The renderer splits its positional path arguments on whitespace, so the
    /// XML path, template directory and output directory must not contain any.
    ///
    /// # Errors
    ///
    /// Returns [`ExternalError::InvalidArgument`] naming the first offending argument.
    pub fn validate(&self) -> Result<(), ExternalError> {
        reject_whitespace("XML path", &self.xml_path)?;
        reject_whitespace("template directory", &self.template_dir)?;
        reject_whitespace("output directory", &self.output_dir)?;
        Ok(())
    }

    /// Renderer command.
    #[must_use]
    pub fn command(&self) -> &RendererCommand {
        &self.command
    }

    /// XML file handed to the renderer.
    #[must_use]
    pub fn xml_path(&self) -> &Path {
        &self.xml_path
    }

    /// Template directory.
    #[must_use]
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Directory the renderer writes its artifact into.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Serialized parameter object.
    #[must_use]
    pub fn parameters_json(&self) -> &str {
        &self.parameters_json
    }

    /// Full argument vector, excluding the executable.
    ///
    /// Each value is a separate argument, so spaces inside the JSON payload
    /// never shift argument boundaries. Directories carry a trailing separator
    /// because the renderer appends file names to them directly.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.command.jvm_args.iter().map(OsString::from).collect();
        if let Some(class_path) = &self.command.class_path {
            args.push("-classpath".into());
            args.push(class_path.into());
        }
        if let Some(jar) = &self.command.jar {
            args.push("-jar".into());
            args.push(jar.into());
        }
        args.push(self.xml_path.clone().into_os_string());
        args.push(with_trailing_separator(&self.template_dir));
        args.push(with_trailing_separator(&self.output_dir));
        args.push(self.parameters_json.clone().into());
        args
    }

    /// Shell-quoted command line, for logs and diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.executable.as_os_str().to_owned())
            .chain(self.args())
            .map(|arg| shell_quote(&arg.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn reject_whitespace(argument: &'static str, path: &Path) -> Result<(), ExternalError> {
    let value = path.to_string_lossy();
    if value.chars().any(char::is_whitespace) {
        return Err(ExternalError::InvalidArgument {
            argument,
            value: value.into_owned(),
            reason: "must not contain whitespace",
        });
    }
    Ok(())
}

fn with_trailing_separator(dir: &Path) -> OsString {
    let mut arg = dir.as_os_str().to_owned();
    if !arg.to_string_lossy().ends_with(MAIN_SEPARATOR) {
        arg.push(MAIN_SEPARATOR_STR);
    }
    arg
}

/// Quote an argument for a POSIX shell unless it only has safe characters.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if safe {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(xml: &str, templates: &str, output: &str) -> ExternalRenderRequest {
        ExternalRenderRequest::new(
            RendererCommand::new("java")
                .jvm_args(["-Dfile.encoding=IBM850"])
                .class_path("/opt/kude/lib/")
                .jar("/opt/kude/CreateKude.jar"),
            xml,
            templates,
            output,
            r#"{"REPORT_LOCALE":"es_PY","NOTE":"two words"}"#,
        )
    }

    #[test]
    fn test_args_order() {
        let args: Vec<String> = request("/w/de.xml", "/opt/templates", "/w/out/")
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-Dfile.encoding=IBM850",
                "-classpath",
                "/opt/kude/lib/",
                "-jar",
                "/opt/kude/CreateKude.jar",
                "/w/de.xml",
                "/opt/templates/",
                "/w/out/",
                r#"{"REPORT_LOCALE":"es_PY","NOTE":"two words"}"#,
            ]
        );
    }

    #[test]
    fn test_args_without_jar() {
        let request = ExternalRenderRequest::new(
            RendererCommand::new("/usr/local/bin/render"),
            "/w/de.xml",
            "/t",
            "/o",
            "{}",
        );
        let args: Vec<String> = request
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["/w/de.xml", "/t/", "/o/", "{}"]);
    }

    #[test]
    fn test_validate_accepts_paths_without_whitespace() {
        assert!(request("/w/de.xml", "/t", "/o").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_whitespace() {
        let cases = [
            (request("/my docs/de.xml", "/t", "/o"), "XML path"),
            (request("/w/de.xml", "/my templates", "/o"), "template directory"),
            (request("/w/de.xml", "/t", "/out\tdir"), "output directory"),
        ];
        for (request, expected) in cases {
            match request.validate() {
                Err(ExternalError::InvalidArgument { argument, .. }) => {
                    assert_eq!(argument, expected);
                }
                other => panic!("expected InvalidArgument for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_command_line_quotes_values_with_spaces() {
        let line = request("/w/de.xml", "/t", "/o").command_line();
        assert!(line.starts_with("java -Dfile.encoding=IBM850 -classpath"));
        assert!(line.ends_with(r#"'{"REPORT_LOCALE":"es_PY","NOTE":"two words"}'"#));
    }

    #[test]
    fn test_shell_quote_single_quote() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
