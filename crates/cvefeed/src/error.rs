//! 취약점 피드 에러 타입
//!
//! [`CveFeedError`]는 사전 로딩과 피드 파싱에서 발생하는 에러를
//! 나타냅니다. 매칭 경로는 전역 함수이므로 에러 타입이 없습니다.

/// 취약점 피드 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CveFeedError {
    /// 피드 파일 로딩 실패
    #[error("dictionary load error: {path}: {reason}")]
    DictionaryLoad {
        /// 피드 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 피드 본문 파싱 실패
    #[error("feed parse error: {0}")]
    Parse(String),

    /// 로딩 결과 사전이 비어 있음 (치명적)
    #[error("dictionary is empty")]
    EmptyDictionary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_load_display() {
        let err = CveFeedError::DictionaryLoad {
            path: "nvdcve-1.0-2024.json".to_owned(),
            reason: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("nvdcve-1.0-2024.json"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn parse_display() {
        let err = CveFeedError::Parse("unexpected end of input".to_owned());
        assert!(err.to_string().contains("unexpected end of input"));
    }

    #[test]
    fn empty_dictionary_display() {
        assert_eq!(CveFeedError::EmptyDictionary.to_string(), "dictionary is empty");
    }
}
