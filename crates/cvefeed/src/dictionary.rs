//! 취약점 사전 -- 피드 로딩과 오버라이드 합성
//!
//! [`Dictionary`]는 메모리에 로드된 취약점 레코드의 집합입니다.
//! 시작 시 한 번 구축되며 이후 매칭 동안 읽기 전용으로 공유됩니다.
//!
//! # 로딩 의미론
//!
//! 여러 피드 파일을 받아 하나의 사전으로 합칩니다. 일부 파일이
//! 실패해도 나머지로 진행하며 경고를 남깁니다. 결과 사전이 비어
//! 있으면 [`CveFeedError::EmptyDictionary`]로 치명적입니다.
//! gzip 파일(매직 바이트 `1f 8b`)은 투명하게 해제됩니다.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;

use crate::error::CveFeedError;
use crate::merge::merge_records;
use crate::schema::NvdFeed;
use crate::vuln::{VulnRecord, Vulnerability};

/// 취약점 레코드 집합
#[derive(Default)]
pub struct Dictionary {
    records: Vec<Arc<VulnRecord>>,
}

impl Dictionary {
    /// 빈 사전을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드 목록으로 사전을 생성합니다.
    pub fn from_records(records: Vec<Arc<VulnRecord>>) -> Self {
        Self { records }
    }

    /// JSON 피드 문자열을 파싱하여 사전을 생성합니다.
    pub fn from_json_str(json: &str) -> Result<Self, CveFeedError> {
        let feed: NvdFeed = serde_json::from_str(json)
            .map_err(|e| CveFeedError::Parse(format!("failed to parse feed JSON: {e}")))?;
        let records = feed
            .cve_items
            .iter()
            .filter_map(|item| VulnRecord::from_schema(item).map(Arc::new))
            .collect();
        Ok(Self { records })
    }

    /// 여러 피드 파일을 로드하여 하나의 사전으로 합칩니다.
    ///
    /// 파일 단위 실패는 로그를 남기고 건너뜁니다. 모든 파일이
    /// 실패했거나 레코드가 하나도 없으면 에러입니다.
    pub fn load_json_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, CveFeedError> {
        let mut records = Vec::new();
        let mut failures = 0usize;
        for path in paths {
            let path = path.as_ref();
            match load_one_file(path) {
                Ok(dict) => {
                    tracing::info!(
                        path = %path.display(),
                        records = dict.records.len(),
                        "loaded vulnerability feed"
                    );
                    records.extend(dict.records);
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to load feed");
                    failures += 1;
                }
            }
        }
        if records.is_empty() {
            return Err(CveFeedError::EmptyDictionary);
        }
        if failures > 0 {
            tracing::warn!(
                failures,
                loaded = records.len(),
                "proceeding with partially loaded dictionary"
            );
        }
        Ok(Self { records })
    }

    /// 레코드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 사전이 비어 있는지 반환합니다.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 전체 레코드 슬라이스를 반환합니다.
    pub fn records(&self) -> &[Arc<VulnRecord>] {
        &self.records
    }

    /// 오버라이드 사전을 적용합니다.
    ///
    /// 식별자가 일치하는 레코드마다 base 구성을
    /// `base AND NOT override`로 교체하고, CWE는 최초 등장 순서로
    /// 합치고, CVSS 점수는 버전별로 큰 쪽을 취합니다. 오버라이드에만
    /// 있는 레코드는 무시합니다.
    pub fn apply_overrides(&mut self, overrides: &Dictionary) {
        let by_id: std::collections::HashMap<&str, &Arc<VulnRecord>> = overrides
            .records
            .iter()
            .map(|r| (r.id(), r))
            .collect();
        let mut replaced = 0usize;
        for record in &mut self.records {
            if let Some(overlay) = by_id.get(record.id()) {
                *record = Arc::new(merge_records(record, overlay));
                replaced += 1;
            }
        }
        tracing::info!(
            replaced,
            ignored = overrides.len().saturating_sub(replaced),
            "applied dictionary overrides"
        );
    }
}

fn load_one_file(path: &Path) -> Result<Dictionary, CveFeedError> {
    let load_error = |reason: String| CveFeedError::DictionaryLoad {
        path: path.display().to_string(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| load_error(e.to_string()))?;
    let json = if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = GzDecoder::new(bytes.as_slice());
        let mut decompressed = String::new();
        decoder
            .read_to_string(&mut decompressed)
            .map_err(|e| load_error(format!("gzip decode failed: {e}")))?;
        decompressed
    } else {
        String::from_utf8(bytes).map_err(|e| load_error(e.to_string()))?
    };
    Dictionary::from_json_str(&json)
}
