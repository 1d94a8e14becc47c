#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const ICON_BYTES: &[u8] = b"\x89PNG\r\n\x1a\ncli icon";

const BUILDER_SCRIPT: &str = r#"#!/bin/sh
set -e
while [ $# -gt 0 ]; do
  case "$1" in
    --name) name="$2"; shift 2 ;;
    --install-root) root="$2"; shift 2 ;;
    --id|--url|--icon) shift 2 ;;
    *) shift ;;
  esac
done
app="$root/$name"
mkdir -p "$app/resources"
printf 'installed archive' > "$app/resources/app.asar"
printf 'installed pak' > "$app/content_shell.pak"
printf '#!/bin/sh\n' > "$app/$name"
touch "$root/.built"
echo "building $name" >&2
echo "$app"
"#;

const FAILING_BUILDER_SCRIPT: &str = "#!/bin/sh\necho 'packager exploded' >&2\nexit 3\n";

/// A scratch home with a local icon and a fake builder.
pub struct Sandbox {
    pub temp: TempDir,
    pub root: PathBuf,
}

impl Sandbox {
    pub fn new(prefix: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .expect("tempdir");
        let root = fs::canonicalize(temp.path()).expect("canonical root");
        fs::write(root.join("icon.png"), ICON_BYTES).expect("icon");
        write_script(&root.join("builder.sh"), BUILDER_SCRIPT);
        write_script(&root.join("failing-builder.sh"), FAILING_BUILDER_SCRIPT);
        Self { temp, root }
    }

    pub fn home(&self) -> PathBuf {
        self.root.join("home")
    }

    pub fn install_root(&self) -> PathBuf {
        self.root.join("apps")
    }

    pub fn local_icon(&self) -> PathBuf {
        self.root.join("icon.png")
    }

    pub fn builder(&self) -> PathBuf {
        self.root.join("builder.sh")
    }

    pub fn failing_builder(&self) -> PathBuf {
        self.root.join("failing-builder.sh")
    }

    pub fn state_root(&self) -> PathBuf {
        self.home().join(".hoist")
    }

    pub fn shared_dir(&self, version: &str) -> PathBuf {
        self.state_root().join("versions").join(version)
    }

    pub fn icon_store(&self, id: &str) -> PathBuf {
        self.state_root().join("icons").join(format!("{id}.png"))
    }

    /// `hoist-install` with every required flag filled in, isolated from the caller's env.
    pub fn command(&self, icon: &str, builder: &Path) -> Command {
        self.command_for("app1", icon, builder)
    }

    pub fn command_for(&self, id: &str, icon: &str, builder: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("hoist-install");
        for key in [
            "HOIST_ID",
            "HOIST_NAME",
            "HOIST_URL",
            "HOIST_ICON",
            "HOIST_INSTALL_ROOT",
            "HOIST_HOME",
            "HOIST_RUNTIME_VERSION",
            "HOIST_TEMP_DIR",
            "HOIST_STATE_DIR",
            "HOIST_APPLICATIONS_DIR",
            "HOIST_BUILDER",
            "HOIST_PLATFORM",
        ] {
            cmd.env_remove(key);
        }
        cmd.env("HOIST_KEEP_PROXIES", "0")
            .arg("--id")
            .arg(id)
            .arg("--name")
            .arg("Example")
            .arg("--url")
            .arg("https://example.com")
            .arg("--icon")
            .arg(icon)
            .arg("--install-root")
            .arg(self.install_root())
            .arg("--home")
            .arg(self.home())
            .arg("--runtime-version")
            .arg("v1")
            .arg("--temp-dir")
            .arg(self.root.join("tmp"))
            .arg("--builder")
            .arg(builder);
        cmd
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    }
}

/// Every non-empty stdout line parsed as JSON.
pub fn stdout_reports(assert: &Assert) -> Vec<Value> {
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("failure line is json"))
        .collect()
}

pub fn only_report(assert: &Assert) -> Value {
    let mut reports = stdout_reports(assert);
    assert_eq!(reports.len(), 1, "expected exactly one failure line");
    reports.remove(0)
}
