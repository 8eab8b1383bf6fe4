//! 레코드 오버라이드 합성 -- "base AND NOT override"
//!
//! 오버라이드 사전의 레코드는 base 레코드의 매칭 범위를 깎아냅니다:
//! 합성된 구성은 base 구성이 참이고 오버라이드 구성이 거짓일 때만
//! 참입니다. 구조적으로 같은 합성을 거듭 적용해도 의미는 변하지
//! 않습니다 (멱등).

use crate::node::LogicalNode;
use crate::vuln::{CvssMetric, VulnRecord, Vulnerability};

/// base 레코드에 오버라이드를 합성한 새 레코드를 만듭니다.
///
/// - 구성: `AND(OR(base), NOT(OR(override)))`
/// - CWE: 최초 등장 순서를 유지한 합집합
/// - CVSS: 버전별로 큰 기본 점수가 이기며 벡터도 함께 따라갑니다
/// - 참조 이름: 최초 등장 순서를 유지한 합집합 (`cves()` 투영이
///   자연스럽게 합쳐집니다)
pub(crate) fn merge_records(base: &VulnRecord, overlay: &VulnRecord) -> VulnRecord {
    let config = vec![LogicalNode::and(
        vec![
            LogicalNode::or(base.config().to_vec(), vec![]),
            LogicalNode::or(overlay.config().to_vec(), vec![]).negated(),
        ],
        vec![],
    )];

    let mut cwes = base.cwes().to_vec();
    for cwe in overlay.cwes() {
        if !cwes.contains(cwe) {
            cwes.push(cwe.clone());
        }
    }

    let mut reference_names = base.reference_names().to_vec();
    for name in overlay.reference_names() {
        if !reference_names.contains(name) {
            reference_names.push(name.clone());
        }
    }

    let cvss_v2 = pick_higher(base.cvss_v2(), overlay.cvss_v2());
    let cvss_v3 = pick_higher(base.cvss_v3(), overlay.cvss_v3());

    VulnRecord::with_parts(
        base.id().to_owned(),
        config,
        cwes,
        reference_names,
        cvss_v2,
        cvss_v3,
    )
}

fn pick_higher(base: Option<&CvssMetric>, overlay: Option<&CvssMetric>) -> Option<CvssMetric> {
    match (base, overlay) {
        (Some(b), Some(o)) => Some(if o.base_score > b.base_score {
            o.clone()
        } else {
            b.clone()
        }),
        (Some(b), None) => Some(b.clone()),
        (None, Some(o)) => Some(o.clone()),
        (None, None) => None,
    }
}
