//! Copies images shipped with the seed fixtures into the media root.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::config::MediaPair;

/// Copy every regular file directly inside each `src` (relative to
/// `base_dir`) into `media_root/dst`. A `src` that is itself a file is
/// copied into `dst`. Missing sources are skipped, and existing targets
/// are kept unless `force` is set.
///
/// Returns the number of files copied.
pub fn copy_seed_media(
    base_dir: &Path,
    media_root: &Path,
    pairs: &[MediaPair],
    force: bool,
) -> io::Result<usize> {
    let mut copied = 0;

    for pair in pairs {
        let src = base_dir.join(&pair.src);
        if !src.exists() {
            debug!(src = %src.display(), "Seed media source missing, skipping");
            continue;
        }

        let dst_dir = media_root.join(&pair.dst);
        fs::create_dir_all(&dst_dir)?;

        if src.is_file() {
            copied += copy_one(&src, &dst_dir, force)?;
            continue;
        }

        for entry in fs::read_dir(&src)? {
            let path = entry?.path();
            if path.is_file() {
                copied += copy_one(&path, &dst_dir, force)?;
            }
        }
    }

    info!(copied, media_root = %media_root.display(), "Seed media copied");
    Ok(copied)
}

fn copy_one(file: &Path, dst_dir: &Path, force: bool) -> io::Result<usize> {
    let Some(name) = file.file_name() else {
        return Ok(0);
    };
    let target = dst_dir.join(name);
    if target.exists() && !force {
        return Ok(0);
    }
    fs::copy(file, &target)?;
    Ok(1)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn pair(src: &str, dst: &str) -> MediaPair {
        MediaPair {
            src: PathBuf::from(src),
            dst: PathBuf::from(dst),
        }
    }

    #[test]
    fn copies_top_level_files_only() {
        let base = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let logos = base.path().join("static/logos");
        fs::create_dir_all(logos.join("viejos")).unwrap();
        fs::write(logos.join("red.png"), b"red").unwrap();
        fs::write(logos.join("semillas.png"), b"semillas").unwrap();
        fs::write(logos.join("viejos/old.png"), b"old").unwrap();

        let copied =
            copy_seed_media(base.path(), media.path(), &[pair("static/logos", "coops/logos")], false)
                .unwrap();

        assert_eq!(copied, 2);
        let dst = media.path().join("coops/logos");
        assert_eq!(fs::read(dst.join("red.png")).unwrap(), b"red");
        assert!(dst.join("semillas.png").is_file());
        assert!(!dst.join("viejos").exists());
    }

    #[test]
    fn missing_source_is_skipped() {
        let base = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();

        let copied =
            copy_seed_media(base.path(), media.path(), &[pair("nope", "coops/logos")], false)
                .unwrap();

        assert_eq!(copied, 0);
        assert!(!media.path().join("coops/logos").exists());
    }

    #[test]
    fn existing_targets_kept_unless_forced() {
        let base = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        fs::create_dir_all(base.path().join("fotos")).unwrap();
        fs::write(base.path().join("fotos/minga.jpg"), b"nueva").unwrap();
        fs::create_dir_all(media.path().join("coops/fotos")).unwrap();
        fs::write(media.path().join("coops/fotos/minga.jpg"), b"vieja").unwrap();

        let pairs = [pair("fotos", "coops/fotos")];
        assert_eq!(copy_seed_media(base.path(), media.path(), &pairs, false).unwrap(), 0);
        assert_eq!(
            fs::read(media.path().join("coops/fotos/minga.jpg")).unwrap(),
            b"vieja"
        );

        assert_eq!(copy_seed_media(base.path(), media.path(), &pairs, true).unwrap(), 1);
        assert_eq!(
            fs::read(media.path().join("coops/fotos/minga.jpg")).unwrap(),
            b"nueva"
        );
    }

    #[test]
    fn single_file_source_is_copied_into_dst() {
        let base = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        fs::write(base.path().join("portada.jpg"), b"jpg").unwrap();

        let copied =
            copy_seed_media(base.path(), media.path(), &[pair("portada.jpg", "inicio")], false)
                .unwrap();

        assert_eq!(copied, 1);
        assert!(media.path().join("inicio/portada.jpg").is_file());
    }
}
