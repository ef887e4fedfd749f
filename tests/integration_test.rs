use assert_cmd::Command;
use assert_cmd::cargo;
use binboot::platform::PlatformId;
use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::{Mock, Server, ServerGuard};
use predicates::prelude::*;
use std::fs;
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use tar::Builder;
use tempfile::{TempDir, tempdir};

fn create_tar_gz_with_executable(files: &[(&str, &str, u32)]) -> Vec<u8> {
    let mut tar_builder = Builder::new(Vec::new());
    for (name, content, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_path(name).unwrap();
        header.set_mode(*mode);
        header.set_cksum();
        tar_builder.append(&header, content.as_bytes()).unwrap();
    }
    let tar = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

/// A package directory with a manifest and an install root.
struct Fixture {
    dir: TempDir,
    platform: PlatformId,
}

impl Fixture {
    fn new(version: &str) -> Self {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            format!(
                r#"{{"name": "tool", "version": "{}", "binary": {{"repository": "owner/tool"}}}}"#,
                version
            ),
        )
        .unwrap();
        Self {
            dir,
            platform: PlatformId::current().unwrap(),
        }
    }

    fn manifest(&self) -> PathBuf {
        self.dir.path().join("package.json")
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    fn executable_name(&self) -> String {
        self.platform.executable_name("tool")
    }

    fn asset_path(&self, version: &str) -> String {
        format!(
            "/owner/tool/releases/download/v{}/tool-{}.tar.gz",
            version, self.platform
        )
    }

    fn install_dir(&self, version: &str) -> PathBuf {
        self.root()
            .join("tool")
            .join(version)
            .join(self.platform.as_str())
    }

    fn command(&self, server: &ServerGuard) -> Command {
        let mut cmd = Command::new(cargo::cargo_bin!("binboot"));
        clear_env(&mut cmd);
        cmd.arg("--root")
            .arg(self.root())
            .arg("--manifest")
            .arg(self.manifest())
            .arg("--host")
            .arg(server.url());
        cmd
    }

    /// Serve the release archive, expecting exactly `hits` downloads.
    fn serve(
        &self,
        server: &mut ServerGuard,
        version: &str,
        files: &[(&str, &str, u32)],
        hits: usize,
    ) -> Mock {
        server
            .mock("GET", self.asset_path(version).as_str())
            .with_status(200)
            .with_header("content-type", "application/gzip")
            .with_body(create_tar_gz_with_executable(files))
            .expect(hits)
            .create()
    }
}

fn clear_env(cmd: &mut Command) {
    for key in [
        "BINBOOT_ROOT",
        "BINBOOT_MANIFEST",
        "BINBOOT_HOST",
        "BINBOOT_VERSION",
        "GITHUB_TOKEN",
    ] {
        cmd.env_remove(key);
    }
}

fn assert_no_version_dir(root: &Path, version: &str) {
    assert!(
        !root.join("tool").join(version).exists(),
        "unexpected install directory for {}",
        version
    );
}

#[test_log::test]
fn test_install_then_path_fetches_once() {
    let mut server = Server::new();
    let fixture = Fixture::new("1.0.0");
    let exe = fixture.executable_name();
    let mock = fixture.serve(&mut server, "1.0.0", &[(exe.as_str(), "binary", 0o755)], 1);

    fixture.command(&server).arg("install").assert().success();

    let expected = fixture.install_dir("1.0.0").join(&exe);
    fixture
        .command(&server)
        .arg("path")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.to_string_lossy().as_ref()));

    mock.assert();
    assert!(expected.exists());
    assert_eq!(fs::read_to_string(expected).unwrap(), "binary");
}

#[test]
fn test_missing_release_exits_with_download_code() {
    let mut server = Server::new();
    let fixture = Fixture::new("9.9.9");
    let mock = server
        .mock("GET", fixture.asset_path("9.9.9").as_str())
        .with_status(404)
        .create();

    fixture
        .command(&server)
        .arg("install")
        .assert()
        .code(75)
        .stderr(predicate::str::contains(fixture.asset_path("9.9.9")))
        .stderr(predicate::str::contains("404"));

    mock.assert();
    assert_no_version_dir(&fixture.root(), "9.9.9");
}

#[test]
fn test_archive_without_executable_exits_with_extraction_code() {
    let mut server = Server::new();
    let fixture = Fixture::new("1.0.0");
    let _mock = fixture.serve(&mut server, "1.0.0", &[("README.md", "docs", 0o644)], 1);

    fixture
        .command(&server)
        .arg("path")
        .assert()
        .code(65)
        .stderr(predicate::str::contains(fixture.executable_name()));

    assert_no_version_dir(&fixture.root(), "1.0.0");
}

#[test]
fn test_html_error_page_is_rejected() {
    let mut server = Server::new();
    let fixture = Fixture::new("1.0.0");
    let _mock = server
        .mock("GET", fixture.asset_path("1.0.0").as_str())
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html>rate limited</html>")
        .create();

    fixture
        .command(&server)
        .arg("install")
        .assert()
        .code(75)
        .stderr(predicate::str::contains("text/html"));

    assert_no_version_dir(&fixture.root(), "1.0.0");
}

#[test]
fn test_missing_manifest_exits_with_config_code() {
    let server = Server::new();
    let fixture = Fixture::new("1.0.0");
    fs::remove_file(fixture.manifest()).unwrap();

    fixture
        .command(&server)
        .arg("install")
        .assert()
        .code(78)
        .stderr(predicate::str::starts_with("binboot: "));
}

#[test]
fn test_version_override_installs_side_by_side() {
    let mut server = Server::new();
    let fixture = Fixture::new("1.0.0");
    let exe = fixture.executable_name();
    let v1 = fixture.serve(&mut server, "1.0.0", &[(exe.as_str(), "one", 0o755)], 1);
    let v2 = fixture.serve(&mut server, "2.0.0", &[(exe.as_str(), "two", 0o755)], 1);

    fixture.command(&server).arg("install").assert().success();
    fixture
        .command(&server)
        .env("BINBOOT_VERSION", "2.0.0")
        .arg("install")
        .assert()
        .success();

    v1.assert();
    v2.assert();
    let one = fixture.install_dir("1.0.0").join(&exe);
    let two = fixture.install_dir("2.0.0").join(&exe);
    assert_eq!(fs::read_to_string(one).unwrap(), "one");
    assert_eq!(fs::read_to_string(two).unwrap(), "two");
}

#[test]
fn test_uninstall_removes_package() {
    let mut server = Server::new();
    let fixture = Fixture::new("1.0.0");
    let exe = fixture.executable_name();
    let _mock = fixture.serve(&mut server, "1.0.0", &[(exe.as_str(), "binary", 0o755)], 1);

    fixture.command(&server).arg("install").assert().success();
    assert!(fixture.install_dir("1.0.0").exists());

    fixture
        .command(&server)
        .arg("uninstall")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed tool"));
    assert!(!fixture.root().join("tool").exists());

    fixture
        .command(&server)
        .arg("uninstall")
        .assert()
        .success()
        .stdout(predicate::str::contains("tool is not installed"));
}

#[cfg(unix)]
const STUB_SCRIPT: &str = "#!/bin/sh\necho \"args: $*\"\nexit 7\n";

#[cfg(unix)]
#[test]
fn test_run_forwards_arguments_and_exit_code() {
    let mut server = Server::new();
    let fixture = Fixture::new("1.0.0");
    let _mock = fixture.serve(&mut server, "1.0.0", &[("tool", STUB_SCRIPT, 0o755)], 1);

    for _ in 0..2 {
        fixture
            .command(&server)
            .args(["run", "--help", "-x", "value"])
            .assert()
            .code(7)
            .stdout("args: --help -x value\n");
    }

    let staging = fixture.root().join(".staging");
    assert_eq!(fs::read_dir(staging).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn test_renamed_binary_acts_as_the_package() {
    let mut server = Server::new();
    let fixture = Fixture::new("1.0.0");
    let _mock = fixture.serve(&mut server, "1.0.0", &[("tool", STUB_SCRIPT, 0o755)], 1);

    // The manifest sits one directory above the renamed binary
    let bin_dir = fixture.dir.path().join("bin");
    fs::create_dir(&bin_dir).unwrap();
    let proxy = bin_dir.join("tool");
    fs::copy(cargo::cargo_bin!("binboot"), &proxy).unwrap();

    let mut cmd = Command::new(&proxy);
    clear_env(&mut cmd);
    cmd.env("BINBOOT_ROOT", fixture.root())
        .env("BINBOOT_HOST", server.url())
        .args(["install", "--root", "/elsewhere"])
        .assert()
        .code(7)
        .stdout("args: install --root /elsewhere\n");

    assert!(fixture.install_dir("1.0.0").join("tool").exists());
}
