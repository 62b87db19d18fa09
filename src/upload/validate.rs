use crate::util::format_file_size;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum UploadError {
    #[error("upload widget markup is missing {0}")]
    Markup(&'static str),
    #[error("파일이 너무 큽니다: {name} (최대 {max})")]
    TooLarge { name: String, max: String },
    #[error("허용되지 않은 파일 형식입니다: {name}")]
    TypeNotAllowed { name: String },
    #[error("파일은 최대 {max}개까지 첨부할 수 있습니다: {name}")]
    TooMany { name: String, max: usize },
}

/// The parts of a selected file the checks look at.
#[derive(Clone, Debug)]
pub(crate) struct Candidate {
    pub name: String,
    pub size: u64,
    pub mime: String,
}

#[derive(Clone, Debug)]
pub(crate) struct Limits<'a> {
    pub max_files: usize,
    pub max_file_size: u64,
    pub allowed_types: &'a [String],
}

/// `type/*` entries match by prefix. An empty allow-list admits everything.
pub(crate) fn is_allowed_type(mime: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    allowed.iter().any(|t| match t.strip_suffix('*') {
        Some(prefix) if prefix.ends_with('/') => mime.starts_with(prefix),
        _ => mime == t,
    })
}

pub(crate) fn check_file(file: &Candidate, limits: &Limits<'_>) -> Result<(), UploadError> {
    if file.size > limits.max_file_size {
        return Err(UploadError::TooLarge {
            name: file.name.clone(),
            max: format_file_size(limits.max_file_size),
        });
    }
    if !is_allowed_type(&file.mime, limits.allowed_types) {
        return Err(UploadError::TypeNotAllowed {
            name: file.name.clone(),
        });
    }
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct BatchCheck {
    /// Indices into the checked slice, in order.
    pub accepted: Vec<usize>,
    pub rejected: Vec<UploadError>,
}

/// Check every file on its own; `existing` items count toward `max_files`.
pub(crate) fn check_batch(files: &[Candidate], existing: usize, limits: &Limits<'_>) -> BatchCheck {
    let mut out = BatchCheck::default();
    for (i, file) in files.iter().enumerate() {
        if let Err(e) = check_file(file, limits) {
            out.rejected.push(e);
            continue;
        }
        if existing + out.accepted.len() >= limits.max_files {
            out.rejected.push(UploadError::TooMany {
                name: file.name.clone(),
                max: limits.max_files,
            });
            continue;
        }
        out.accepted.push(i);
    }
    out
}
