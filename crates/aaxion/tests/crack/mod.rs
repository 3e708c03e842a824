use aaxion::{
    activation::Cracker, ActivationResolver, ActivationSource, AaxionError, CancellationToken,
    Checksum,
};

use crate::{tools::fake_tool, AssertWrapper};

const CHECKSUM: &str = "999a6ab8b8f79c5b8f6d1a7c0d63e1d1a0c8f9e2";

fn checksum() -> Checksum {
    CHECKSUM.parse().unwrap()
}

fn cracker(dir: &std::path::Path, body: &str) -> Cracker {
    let executable = fake_tool(dir, "rcrack", body);
    std::fs::create_dir_all(dir.join("tables")).unwrap();
    Cracker::new(executable, dir.join("tables"))
}

#[tokio::test]
async fn test_crack_found() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    // Fails unless run from the tables' parent with the expected arguments.
    let cracker = cracker(
        dir.path(),
        &format!(
            r#"[ -d "$1" ] || exit 2
[ "$2" = "-h" ] && [ "$3" = "{CHECKSUM}" ] || exit 3
echo "statistics"
echo "{CHECKSUM}  plaintext  hex:1ceb00da"
"#
        ),
    );

    let bytes = cracker.crack(&checksum(), &CancellationToken::new()).await?;
    assert_eq!(bytes.to_string(), "1CEB00DA");

    Ok(())
}

#[tokio::test]
async fn test_crack_relative_executable() -> anyhow::Result<()> {
    // A scratch dir under the working directory, addressed relatively.
    let dir = tempfile::Builder::new().prefix("rcrack-").tempdir_in(".")?;
    let relative = std::path::Path::new(".").join(dir.path().file_name().unwrap());

    std::fs::create_dir_all(relative.join("bin"))?;
    std::fs::create_dir_all(relative.join("rt").join("tables"))?;
    let executable = fake_tool(&relative.join("bin"), "rcrack", "echo \"hex:1ceb00da\"\n");
    assert!(executable.is_relative());

    // rcrack runs from `rt`, where the relative executable path no longer resolves.
    let cracker = Cracker::new(executable, relative.join("rt").join("tables"));
    let bytes = cracker.crack(&checksum(), &CancellationToken::new()).await?;
    assert_eq!(bytes.to_string(), "1CEB00DA");

    Ok(())
}

#[tokio::test]
async fn test_crack_not_found() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cracker = cracker(dir.path(), "echo \"result\"\necho \"<notfound>\"\n");

    let error = cracker
        .crack(&checksum(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, AaxionError::ActivationBytesNotFound(c) if c == CHECKSUM));

    Ok(())
}

#[tokio::test]
async fn test_crack_stderr_is_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cracker = cracker(
        dir.path(),
        "echo \"hex:1ceb00da\"\necho \"table file missing\" >&2\n",
    );

    let error = cracker
        .crack(&checksum(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, AaxionError::CrackFailed(message) if message == "table file missing"));

    Ok(())
}

#[tokio::test]
async fn test_crack_cancelled() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cracker = cracker(dir.path(), "exec sleep 30\n");

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let error = cracker.crack(&checksum(), &cancel).await.unwrap_err();
    assert!(error.is_cancelled());
    assert!(started.elapsed() < std::time::Duration::from_secs(10));

    Ok(())
}

#[tokio::test]
async fn test_resolver_falls_through_to_crack() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cracker = cracker(dir.path(), "echo \"hex:1ceb00da\"\n");

    let resolver = ActivationResolver::new().with_source(ActivationSource::Crack(cracker));
    let bytes = resolver
        .resolve(&checksum(), &CancellationToken::new())
        .await
        .assert_success();
    assert_eq!(bytes.as_bytes(), &[0x1C, 0xEB, 0x00, 0xDA]);

    Ok(())
}
