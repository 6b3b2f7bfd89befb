use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use sha2::{Digest, Sha256};
use eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use crate::db::{self, entities::NewImage, Pool};

// Uploaded images are stored under the hash of their
// content, in two levels of directories so that no
// single directory gets huge:
// {root}/ab/cd/abcd...ef.png
// The same picture uploaded twice is only stored once.
pub struct MediaStore {
  root: PathBuf,
  url_prefix: String
}

pub fn extension_for(content_type: &str) -> Option<&'static str> {
  match content_type {
    "image/png" => Some("png"),
    "image/jpeg" => Some("jpg"),
    "image/gif" => Some("gif"),
    "image/webp" => Some("webp"),
    _ => None
  }
}

impl MediaStore {

  // Crashing at startup is better than finding out the
  // directory isn't writable at the first upload.
  pub fn open(root: &str, url_prefix: &str) -> Result<Self> {
    fs::create_dir_all(root)
      .context(format!("Creating upload directory {}", root))?;
    Ok(Self {
      root: PathBuf::from(root),
      url_prefix: url_prefix.trim_end_matches('/').to_string()
    })
  }

  pub fn file_key(data: &[u8], extension: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{}.{}", hex::encode(hasher.finalize()), extension)
  }

  // Keys are always a 64 chars hash plus an extension, we
  // never build paths from anything else.
  fn is_valid_key(key: &str) -> bool {
    key.len() > 4
      && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
      && !key.starts_with('.')
  }

  fn sharded_path(&self, key: &str) -> PathBuf {
    let mut path = self.root.clone();
    path.push(&key[0..2]);
    path.push(&key[2..4]);
    path.push(key);
    path
  }

  pub fn save(&self, data: &[u8], content_type: &str) -> Result<Option<NewImage>> {
    let extension = match extension_for(content_type) {
      Some(ext) => ext,
      None => return Ok(None)
    };
    let file_key = Self::file_key(data, extension);
    let path = self.sharded_path(&file_key);
    if !path.exists() {
      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
          .context("Creating image directory")?;
      }
      fs::write(&path, data)
        .context(format!("Writing image {}", file_key))?;
    }
    Ok(Some(NewImage {
      file_key,
      content_type: content_type.to_string()
    }))
  }

  pub fn url(&self, key: &str) -> String {
    if !Self::is_valid_key(key) {
      return String::new();
    }
    format!("{}/{}/{}/{}", self.url_prefix, &key[0..2], &key[2..4], key)
  }

  // Removes the file unless another image row still uses it.
  // A file that's already gone is fine.
  pub fn remove_if_unused(&self, pool: &Pool, key: &str) -> Result<bool> {
    if !Self::is_valid_key(key) || db::file_key_in_use(pool, key)? {
      return Ok(false);
    }
    match fs::remove_file(self.sharded_path(key)) {
      Ok(()) => {
        info!("Removed image file {}", key);
        Ok(true)
      },
      Err(e) if e.kind() == ErrorKind::NotFound => {
        warn!("Image file {} was already gone", key);
        Ok(false)
      },
      Err(e) => Err(e).context(format!("Removing image file {}", key))
    }
  }

  #[cfg(test)]
  pub fn path_of(&self, key: &str) -> PathBuf {
    self.sharded_path(key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::test_pool;

  fn temp_store(name: &str) -> MediaStore {
    let dir = std::env::temp_dir()
      .join(format!("board-media-{}-{}", name, std::process::id()));
    MediaStore::open(dir.to_str().unwrap(), "/uploads/").unwrap()
  }

  #[test]
  fn content_addressed_and_sharded() {
    let sut = temp_store("sharded");
    let image = sut.save(b"not really a png", "image/png").unwrap().unwrap();
    assert!(image.file_key.ends_with(".png"));
    assert_eq!(image.file_key.len(), 64 + 4);
    assert!(sut.path_of(&image.file_key).exists());
    let url = sut.url(&image.file_key);
    assert!(url.starts_with(&format!("/uploads/{}/{}/", &image.file_key[0..2], &image.file_key[2..4])));
    let again = sut.save(b"not really a png", "image/png").unwrap().unwrap();
    assert_eq!(again.file_key, image.file_key);
  }

  #[test]
  fn unknown_content_types_are_refused() {
    let sut = temp_store("refused");
    assert!(sut.save(b"#!/bin/sh", "application/x-sh").unwrap().is_none());
  }

  #[test]
  fn unused_files_are_removed() {
    let pool = test_pool();
    let sut = temp_store("removed");
    let image = sut.save(b"some bytes", "image/gif").unwrap().unwrap();
    assert!(sut.remove_if_unused(&pool, &image.file_key).unwrap());
    assert!(!sut.path_of(&image.file_key).exists());
    assert!(!sut.remove_if_unused(&pool, &image.file_key).unwrap());
    assert!(!sut.remove_if_unused(&pool, "../../etc/passwd").unwrap());
  }
}
