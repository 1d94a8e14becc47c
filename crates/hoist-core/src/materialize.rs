use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use tracing::debug;

/// Inputs handed to the app builder.
#[derive(Debug, Clone, Copy)]
pub struct MaterializeRequest<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub url: &'a str,
    pub icon: &'a Path,
    pub install_root: &'a Path,
}

/// Produces an installed app directory and returns its path.
pub trait AppMaterializer: Send + Sync {
    fn materialize(&self, request: &MaterializeRequest<'_>) -> Result<PathBuf>;
}

impl<F> AppMaterializer for F
where
    F: Fn(&MaterializeRequest<'_>) -> Result<PathBuf> + Send + Sync,
{
    fn materialize(&self, request: &MaterializeRequest<'_>) -> Result<PathBuf> {
        self(request)
    }
}

/// Runs an external builder executable.
///
/// The builder receives `--id --name --url --icon --install-root` and must print the installed
/// app directory as the last non-empty line of stdout.
#[derive(Debug, Clone)]
pub struct CommandMaterializer {
    program: PathBuf,
    extra_args: Vec<OsString>,
}

impl CommandMaterializer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Arguments placed before the generated flags, e.g. a script path for an interpreter.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl AppMaterializer for CommandMaterializer {
    fn materialize(&self, request: &MaterializeRequest<'_>) -> Result<PathBuf> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.extra_args)
            .arg("--id")
            .arg(request.id)
            .arg("--name")
            .arg(request.name)
            .arg("--url")
            .arg(request.url)
            .arg("--icon")
            .arg(request.icon)
            .arg("--install-root")
            .arg(request.install_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!(program = %self.program.display(), id = request.id, "running app builder");

        let output = command
            .output()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.program.display(),
                output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |code| code.to_string()),
                stderr.trim()
            ));
        }

        let path = stdout
            .lines()
            .map(str::trim)
            .rev()
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("{} printed no app path", self.program.display()))?;
        if !path.is_dir() {
            return Err(anyhow!(
                "app builder reported {} but it is not a directory",
                path.display()
            ));
        }
        Ok(path)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    fn request<'a>(icon: &'a Path, root: &'a Path) -> MaterializeRequest<'a> {
        MaterializeRequest {
            id: "app1",
            name: "Example",
            url: "https://example.com",
            icon,
            install_root: root,
        }
    }

    #[test]
    fn command_materializer_reads_last_stdout_line() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let app = temp.path().join("Example");
        fs::create_dir_all(&app)?;
        let script = format!("echo building; echo '{}'; echo", app.display());

        let materializer =
            CommandMaterializer::new("sh").with_args(["-c", script.as_str(), "builder"]);
        let icon = temp.path().join("icon.png");
        let path = materializer.materialize(&request(&icon, temp.path()))?;
        assert_eq!(path, app);
        Ok(())
    }

    #[test]
    fn command_materializer_surfaces_stderr_on_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let materializer =
            CommandMaterializer::new("sh").with_args(["-c", "echo boom >&2; exit 3", "builder"]);
        let icon = temp.path().join("icon.png");
        let err = materializer
            .materialize(&request(&icon, temp.path()))
            .expect_err("builder failure");
        let message = err.to_string();
        assert!(message.contains("exited with 3"), "{message}");
        assert!(message.contains("boom"), "{message}");
    }

    #[test]
    fn command_materializer_rejects_missing_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let materializer =
            CommandMaterializer::new("sh").with_args(["-c", "echo /definitely/not/here", "sh"]);
        let icon = temp.path().join("icon.png");
        let err = materializer
            .materialize(&request(&icon, temp.path()))
            .expect_err("missing dir");
        assert!(err.to_string().contains("not a directory"));
    }

    fn build_under_root(req: &MaterializeRequest<'_>) -> Result<PathBuf> {
        let dir = req.install_root.join(req.name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    #[test]
    fn functions_act_as_materializers() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().to_path_buf();
        let icon = temp.path().join("icon.png");
        let path = build_under_root.materialize(&request(&icon, &root))?;
        assert_eq!(path, root.join("Example"));
        Ok(())
    }
}
