//! Shell-script stand-ins for the external programs.

#![cfg(unix)]

use std::path::{Path, PathBuf};

use aaxion::checksum::{CHECKSUM_LEN, CHECKSUM_OFFSET};

/// Write an executable `sh` script named `name` into `dir`.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::{io::Write, os::unix::fs::PermissionsExt};

    let path = dir.join(name);
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file.sync_all().unwrap();
    }
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Write a fake container whose checksum field holds `checksum`.
pub fn fake_container(path: &Path, checksum: [u8; CHECKSUM_LEN]) {
    let mut data = vec![0u8; 4096];
    let offset = CHECKSUM_OFFSET as usize;
    data[offset..offset + CHECKSUM_LEN].copy_from_slice(&checksum);
    std::fs::write(path, data).unwrap();
}

/// ffprobe reporting the given brand and a fixed set of tags.
pub fn fake_ffprobe(dir: &Path, brand: &str, duration: &str) -> PathBuf {
    fake_tool(
        dir,
        "ffprobe",
        &format!(
            r#"for last; do :; done
[ -f "$last" ] || {{ echo "$last: No such file or directory" >&2; exit 1; }}
cat <<'JSON'
{{
  "format": {{
    "filename": "book.aax",
    "duration": "{duration}",
    "tags": {{
      "major_brand": "{brand}",
      "artist": "Jane Doe",
      "title": "A Long Book",
      "date": "2019"
    }}
  }}
}}
JSON
"#
        ),
    )
}

/// ffmpeg that appends its arguments to `log`, reports progress and
/// creates its last argument.
pub fn fake_ffmpeg(dir: &Path, log: &Path) -> PathBuf {
    fake_tool(
        dir,
        "ffmpeg",
        &format!(
            r#"echo "$@" >> '{log}'
echo "out_time=00:30:00.000000"
echo "progress=continue"
echo "out_time=01:00:00.000000"
echo "progress=end"
for last; do :; done
: > "$last"
"#,
            log = log.display()
        ),
    )
}

/// ffmpeg that appends its arguments to `log` and fails without writing anything.
pub fn fake_failing_ffmpeg(dir: &Path, log: &Path) -> PathBuf {
    fake_tool(
        dir,
        "ffmpeg",
        &format!(
            r#"echo "$@" >> '{log}'
echo "out_time=00:10:00.000000"
echo "Invalid data found when processing input" >&2
exit 1
"#,
            log = log.display()
        ),
    )
}
