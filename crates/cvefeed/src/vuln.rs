//! 취약점 레코드와 메타데이터 투영
//!
//! [`VulnRecord`]는 피드에서 디코드된 취약점 하나를 소유합니다:
//! 식별자, 구성 트리, CWE 목록, CVSS v2/v3 기본 점수와 벡터, 참조
//! 이름들. 레코드는 사전이 소유하며 매칭 중에는 불변입니다.
//!
//! [`Vulnerability`] trait은 레코드 메타데이터의 안정적인 추상
//! 뷰입니다. 빠진 구조는 0/빈 값을 돌려주며 실패하지 않습니다.

use std::sync::LazyLock;

use regex::Regex;

use crate::node::LogicalNode;
use crate::schema::NvdCveItem;

/// CVE 식별자 패턴
static CVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("CVE-[0-9]{4}-[0-9]{4,}").expect("static cve pattern compiles"));

/// CVSS 기본 점수와 벡터 문자열
#[derive(Debug, Clone, PartialEq)]
pub struct CvssMetric {
    /// 기본 점수 (0.0 - 10.0)
    pub base_score: f64,
    /// 벡터 문자열
    pub vector: String,
}

/// 취약점 메타데이터의 추상 뷰
///
/// 레코드에 없는 값은 0.0 또는 빈 값으로 투영됩니다.
pub trait Vulnerability {
    /// 취약점 식별자를 반환합니다.
    fn id(&self) -> &str;

    /// 레코드가 참조하는 모든 CVE 식별자를 반환합니다.
    ///
    /// 식별자 자신과 참조 이름에서 `CVE-[0-9]{4}-[0-9]{4,}` 패턴을
    /// 추출하며, 최초 등장 순서를 유지한 채 중복을 제거합니다.
    fn cves(&self) -> Vec<String>;

    /// CWE 식별자 목록 (영어 problem type만).
    fn cwes(&self) -> &[String];

    /// CVSS v2 기본 점수. 없으면 0.0입니다.
    fn cvss_v2_base_score(&self) -> f64;

    /// CVSS v2 벡터 문자열. 없으면 빈 문자열입니다.
    fn cvss_v2_vector(&self) -> &str;

    /// CVSS v3 기본 점수. 없으면 0.0입니다.
    fn cvss_v3_base_score(&self) -> f64;

    /// CVSS v3 벡터 문자열. 없으면 빈 문자열입니다.
    fn cvss_v3_vector(&self) -> &str;

    /// v2/v3 중 큰 기본 점수를 반환합니다.
    fn cvss_base_score(&self) -> f64 {
        self.cvss_v2_base_score().max(self.cvss_v3_base_score())
    }
}

/// 피드에서 디코드된 취약점 레코드
#[derive(Debug, Clone)]
pub struct VulnRecord {
    id: String,
    config: Vec<LogicalNode>,
    cwes: Vec<String>,
    reference_names: Vec<String>,
    cvss_v2: Option<CvssMetric>,
    cvss_v3: Option<CvssMetric>,
}

impl VulnRecord {
    /// 구성 요소로부터 레코드를 조립합니다.
    pub fn new(id: impl Into<String>, config: Vec<LogicalNode>) -> Self {
        Self {
            id: id.into(),
            config,
            cwes: Vec::new(),
            reference_names: Vec::new(),
            cvss_v2: None,
            cvss_v3: None,
        }
    }

    pub(crate) fn with_parts(
        id: String,
        config: Vec<LogicalNode>,
        cwes: Vec<String>,
        reference_names: Vec<String>,
        cvss_v2: Option<CvssMetric>,
        cvss_v3: Option<CvssMetric>,
    ) -> Self {
        Self {
            id,
            config,
            cwes,
            reference_names,
            cvss_v2,
            cvss_v3,
        }
    }

    /// 스키마 항목을 디코드합니다.
    ///
    /// 식별자가 없는 항목은 `None`입니다. 구성 트리의 파싱 불가능한
    /// 부분은 [`LogicalNode::from_schema`]가 로그를 남기며 버립니다.
    pub fn from_schema(item: &NvdCveItem) -> Option<Self> {
        let id = item
            .cve
            .as_ref()
            .and_then(|c| c.meta.as_ref())
            .map(|m| m.id.clone())
            .filter(|id| !id.is_empty())?;

        let config: Vec<LogicalNode> = item
            .configurations
            .as_ref()
            .map(|c| c.nodes.iter().filter_map(LogicalNode::from_schema).collect())
            .unwrap_or_default();

        let mut cwes = Vec::new();
        if let Some(pt) = item.cve.as_ref().and_then(|c| c.problemtype.as_ref()) {
            for data in &pt.problemtype_data {
                for desc in &data.description {
                    if desc.lang == "en" && !desc.value.is_empty() && !cwes.contains(&desc.value) {
                        cwes.push(desc.value.clone());
                    }
                }
            }
        }

        let reference_names = item
            .cve
            .as_ref()
            .and_then(|c| c.references.as_ref())
            .map(|r| {
                r.reference_data
                    .iter()
                    .map(|rd| rd.name.clone())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cvss_v2 = item
            .impact
            .as_ref()
            .and_then(|i| i.base_metric_v2.as_ref())
            .and_then(|m| m.cvss_v2.as_ref())
            .map(|c| CvssMetric {
                base_score: c.base_score,
                vector: c.vector_string.clone(),
            });
        let cvss_v3 = item
            .impact
            .as_ref()
            .and_then(|i| i.base_metric_v3.as_ref())
            .and_then(|m| m.cvss_v3.as_ref())
            .map(|c| CvssMetric {
                base_score: c.base_score,
                vector: c.vector_string.clone(),
            });

        Some(Self {
            id,
            config,
            cwes,
            reference_names,
            cvss_v2,
            cvss_v3,
        })
    }

    /// 레코드의 구성 트리를 반환합니다.
    pub fn config(&self) -> &[LogicalNode] {
        &self.config
    }

    pub(crate) fn reference_names(&self) -> &[String] {
        &self.reference_names
    }

    pub(crate) fn cvss_v2(&self) -> Option<&CvssMetric> {
        self.cvss_v2.as_ref()
    }

    pub(crate) fn cvss_v3(&self) -> Option<&CvssMetric> {
        self.cvss_v3.as_ref()
    }
}

impl Vulnerability for VulnRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn cves(&self) -> Vec<String> {
        let mut cves = Vec::new();
        let mut add = |s: &str| {
            if let Some(m) = CVE_PATTERN.find(s) {
                let found = m.as_str().to_owned();
                if !cves.contains(&found) {
                    cves.push(found);
                }
            }
        };
        add(&self.id);
        for name in &self.reference_names {
            add(name);
        }
        cves
    }

    fn cwes(&self) -> &[String] {
        &self.cwes
    }

    fn cvss_v2_base_score(&self) -> f64 {
        self.cvss_v2.as_ref().map_or(0.0, |c| c.base_score)
    }

    fn cvss_v2_vector(&self) -> &str {
        self.cvss_v2.as_ref().map_or("", |c| c.vector.as_str())
    }

    fn cvss_v3_base_score(&self) -> f64 {
        self.cvss_v3.as_ref().map_or(0.0, |c| c.base_score)
    }

    fn cvss_v3_vector(&self) -> &str {
        self.cvss_v3.as_ref().map_or("", |c| c.vector.as_str())
    }
}
