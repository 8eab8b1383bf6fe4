//! NVD JSON 1.0 피드 스키마 -- 엔진이 소비하는 부분집합
//!
//! 전체 NVD 스키마가 아니라 매칭과 메타데이터 투영에 필요한 필드만
//! 선언합니다. 모든 필드는 `default`로 관대하게 파싱되며, 빠진 구조는
//! 디코드 단계에서 0/빈 값으로 투영됩니다.

use serde::Deserialize;

/// 피드 최상위 문서
#[derive(Debug, Deserialize)]
pub struct NvdFeed {
    /// CVE 항목 목록
    #[serde(rename = "CVE_Items", default)]
    pub cve_items: Vec<NvdCveItem>,
}

/// CVE 항목 하나
#[derive(Debug, Deserialize)]
pub struct NvdCveItem {
    #[serde(default)]
    pub cve: Option<NvdCve>,
    #[serde(default)]
    pub configurations: Option<NvdConfigurations>,
    #[serde(default)]
    pub impact: Option<NvdImpact>,
}

#[derive(Debug, Deserialize)]
pub struct NvdCve {
    #[serde(rename = "CVE_data_meta", default)]
    pub meta: Option<NvdMeta>,
    #[serde(default)]
    pub problemtype: Option<NvdProblemType>,
    #[serde(default)]
    pub references: Option<NvdReferences>,
}

#[derive(Debug, Deserialize)]
pub struct NvdMeta {
    #[serde(rename = "ID", default)]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct NvdProblemType {
    #[serde(default)]
    pub problemtype_data: Vec<NvdProblemTypeData>,
}

#[derive(Debug, Deserialize)]
pub struct NvdProblemTypeData {
    #[serde(default)]
    pub description: Vec<NvdLangString>,
}

#[derive(Debug, Deserialize)]
pub struct NvdLangString {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct NvdReferences {
    #[serde(default)]
    pub reference_data: Vec<NvdReference>,
}

#[derive(Debug, Deserialize)]
pub struct NvdReference {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct NvdConfigurations {
    #[serde(default)]
    pub nodes: Vec<NvdNode>,
}

/// 구성 트리 노드
#[derive(Debug, Deserialize)]
pub struct NvdNode {
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub children: Vec<NvdNode>,
    /// 일부 피드 세대는 `cpe` 키를 사용
    #[serde(rename = "cpe_match", alias = "cpe", default)]
    pub cpe_match: Vec<NvdCpeMatch>,
}

/// CPE 매칭 leaf
#[derive(Debug, Deserialize)]
pub struct NvdCpeMatch {
    #[serde(default)]
    pub vulnerable: bool,
    #[serde(rename = "cpe23Uri", default)]
    pub cpe23_uri: Option<String>,
    #[serde(rename = "cpe22Uri", default)]
    pub cpe22_uri: Option<String>,
    #[serde(rename = "versionStartIncluding", default)]
    pub version_start_including: Option<String>,
    #[serde(rename = "versionStartExcluding", default)]
    pub version_start_excluding: Option<String>,
    #[serde(rename = "versionEndIncluding", default)]
    pub version_end_including: Option<String>,
    #[serde(rename = "versionEndExcluding", default)]
    pub version_end_excluding: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NvdImpact {
    #[serde(rename = "baseMetricV2", default)]
    pub base_metric_v2: Option<NvdBaseMetricV2>,
    #[serde(rename = "baseMetricV3", default)]
    pub base_metric_v3: Option<NvdBaseMetricV3>,
}

#[derive(Debug, Deserialize)]
pub struct NvdBaseMetricV2 {
    #[serde(rename = "cvssV2", default)]
    pub cvss_v2: Option<NvdCvss>,
}

#[derive(Debug, Deserialize)]
pub struct NvdBaseMetricV3 {
    #[serde(rename = "cvssV3", default)]
    pub cvss_v3: Option<NvdCvss>,
}

#[derive(Debug, Deserialize)]
pub struct NvdCvss {
    #[serde(rename = "baseScore", default)]
    pub base_score: f64,
    #[serde(rename = "vectorString", default)]
    pub vector_string: String,
}
