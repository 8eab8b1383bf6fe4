//! 논리 구성 트리 -- AND/OR/NEGATE 노드와 CPE 매칭 leaf
//!
//! 취약점 레코드의 구성(configuration)은 [`LogicalNode`]의 재귀
//! 트리입니다. 내부 노드는 연산자와 negate 플래그, 자식 노드를 갖고,
//! leaf는 속성 패턴과 선택적 버전 범위 조건을 갖는 [`CpeMatch`]입니다.
//!
//! 스키마 디코드 시점에 CPE 바인딩을 파싱하며, 파싱 불가능한 leaf는
//! 여기서 로그를 남기고 버려집니다. 매칭 경로는 실패하지 않습니다.

use std::cmp::Ordering;

use cvegate_wfn::{Attributes, Component, strip_slashes};

use crate::schema::{NvdCpeMatch, NvdNode};
use crate::version::smart_version_cmp;

/// 내부 노드의 논리 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

/// CPE 매칭 leaf -- 속성 패턴과 선택적 버전 범위
#[derive(Debug, Clone)]
pub struct CpeMatch {
    /// 대상 속성 패턴
    pub attrs: Attributes,
    /// 이상 (포함)
    pub version_start_including: Option<String>,
    /// 초과 (제외)
    pub version_start_excluding: Option<String>,
    /// 이하 (포함)
    pub version_end_including: Option<String>,
    /// 미만 (제외)
    pub version_end_excluding: Option<String>,
}

impl CpeMatch {
    /// 버전 범위 없이 패턴만으로 leaf를 생성합니다.
    pub fn new(attrs: Attributes) -> Self {
        Self {
            attrs,
            version_start_including: None,
            version_start_excluding: None,
            version_end_including: None,
            version_end_excluding: None,
        }
    }

    /// 스키마 leaf를 디코드합니다. 두 바인딩 모두 파싱에 실패하면
    /// `None`입니다 (호출자가 로그를 남깁니다).
    fn from_schema(m: &NvdCpeMatch) -> Option<Self> {
        let parse = |uri: &Option<String>| {
            uri.as_deref()
                .filter(|u| !u.is_empty())
                .and_then(|u| Attributes::parse(u).ok())
        };
        let attrs = parse(&m.cpe23_uri).or_else(|| parse(&m.cpe22_uri))?;
        Some(Self {
            attrs,
            version_start_including: m.version_start_including.clone(),
            version_start_excluding: m.version_start_excluding.clone(),
            version_end_including: m.version_end_including.clone(),
            version_end_excluding: m.version_end_excluding.clone(),
        })
    }

    /// 버전 범위 조건이 하나라도 설정되었는지 반환합니다.
    pub fn has_version_bounds(&self) -> bool {
        self.version_start_including.is_some()
            || self.version_start_excluding.is_some()
            || self.version_end_including.is_some()
            || self.version_end_excluding.is_some()
    }

    /// 플랫폼 속성 하나에 대해 leaf를 평가합니다.
    ///
    /// 버전 범위가 설정된 leaf는 구조 매칭에서 패턴 버전을 `ANY`로
    /// 취급한 뒤 범위 검사를 별도로 수행합니다. 범위가 없고
    /// `require_version`이 참이면 `ANY` 버전 leaf는 매칭되지 않습니다.
    pub fn match_platform(&self, platform: &Attributes, require_version: bool) -> bool {
        let has_bounds = self.has_version_bounds();
        if !has_bounds && require_version && self.attrs.version.is_any() {
            return false;
        }

        let structural = if has_bounds {
            // 범위가 있으면 패턴 버전은 ANY로 강제됨
            self.attrs.matches_without_version(platform)
        } else {
            self.attrs.matches(platform)
        };
        if !structural {
            return false;
        }

        // NA의 논리값은 ANY하고만 매칭되며 그 검사는 위에서 끝남
        let version = match &platform.version {
            Component::Any | Component::Na => return true,
            Component::Value(v) => v,
        };
        if !has_bounds {
            return true;
        }

        self.version_in_bounds(&strip_slashes(version))
    }

    /// 설정된 모든 범위 조건이 성립하는지 검사합니다.
    fn version_in_bounds(&self, version: &str) -> bool {
        if let Some(b) = &self.version_start_including
            && smart_version_cmp(version, b) == Ordering::Less
        {
            return false;
        }
        if let Some(b) = &self.version_start_excluding
            && smart_version_cmp(version, b) != Ordering::Greater
        {
            return false;
        }
        if let Some(b) = &self.version_end_including
            && smart_version_cmp(version, b) == Ordering::Greater
        {
            return false;
        }
        if let Some(b) = &self.version_end_excluding
            && smart_version_cmp(version, b) != Ordering::Less
        {
            return false;
        }
        true
    }
}

/// 구성 트리 노드
#[derive(Debug, Clone)]
pub struct LogicalNode {
    /// 자식 결합 연산자
    pub operator: Operator,
    /// 최종 불리언 반전 여부
    pub negate: bool,
    /// 자식 노드
    pub children: Vec<LogicalNode>,
    /// 이 노드에 붙은 CPE 매칭 leaf
    pub matches: Vec<CpeMatch>,
}

impl LogicalNode {
    /// OR 노드를 생성합니다.
    pub fn or(children: Vec<LogicalNode>, matches: Vec<CpeMatch>) -> Self {
        Self {
            operator: Operator::Or,
            negate: false,
            children,
            matches,
        }
    }

    /// AND 노드를 생성합니다.
    pub fn and(children: Vec<LogicalNode>, matches: Vec<CpeMatch>) -> Self {
        Self {
            operator: Operator::And,
            negate: false,
            children,
            matches,
        }
    }

    /// negate 플래그를 설정한 사본을 반환합니다.
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    /// 스키마 노드를 디코드합니다.
    ///
    /// 알 수 없는 연산자는 경고를 남기고 OR로 처리합니다. 파싱
    /// 불가능한 leaf는 버려지며, 자식도 leaf도 남지 않은 노드는
    /// `None`입니다.
    pub fn from_schema(node: &NvdNode) -> Option<Self> {
        let operator = match node.operator.as_deref() {
            Some(op) if op.eq_ignore_ascii_case("and") => Operator::And,
            Some(op) if op.eq_ignore_ascii_case("or") => Operator::Or,
            Some(op) => {
                tracing::warn!(operator = %op, "unknown operator, defaulting to OR");
                Operator::Or
            }
            None => Operator::Or,
        };

        let mut matches = Vec::with_capacity(node.cpe_match.len());
        for m in &node.cpe_match {
            match CpeMatch::from_schema(m) {
                Some(leaf) => matches.push(leaf),
                None => {
                    tracing::debug!(
                        cpe23 = m.cpe23_uri.as_deref().unwrap_or(""),
                        cpe22 = m.cpe22_uri.as_deref().unwrap_or(""),
                        "dropping unparseable cpe match"
                    );
                }
            }
        }

        let children: Vec<LogicalNode> = node
            .children
            .iter()
            .filter_map(LogicalNode::from_schema)
            .collect();

        if children.is_empty() && matches.is_empty() {
            tracing::debug!("dropping empty configuration node");
            return None;
        }

        Some(Self {
            operator,
            negate: node.negate,
            children,
            matches,
        })
    }

    /// negate 플래그에 따라 불리언을 반전합니다.
    pub fn negate_if_needed(&self, b: bool) -> bool {
        if self.negate { !b } else { b }
    }

    /// 이 노드의 leaf 중 하나라도 플랫폼과 매칭되는지 평가합니다.
    pub fn match_platform(&self, platform: &Attributes, require_version: bool) -> bool {
        self.matches
            .iter()
            .any(|m| m.match_platform(platform, require_version))
    }

    /// 서브트리의 모든 leaf 패턴을 수집합니다 (인덱스 구축용).
    pub fn collect_cpes<'a>(&'a self, out: &mut Vec<&'a Attributes>) {
        for m in &self.matches {
            out.push(&m.attrs);
        }
        for child in &self.children {
            child.collect_cpes(out);
        }
    }
}
