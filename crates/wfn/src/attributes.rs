//! CPE 속성 모델 -- 11개 WFN 필드와 매칭 관계
//!
//! [`Attributes`]는 CPE 이름의 구조화된 표현입니다. 각 필드는
//! [`Component`]로, `ANY`/`NA` 특수값 또는 인용(quoted) 리터럴을
//! 담습니다. 매칭 관계는 전역 술어(total predicate)이며 실패하지
//! 않습니다.
//!
//! # 매칭 규칙
//!
//! - `ANY`는 어느 쪽에 있든 모든 값과 매칭됩니다.
//! - `NA`는 `ANY` 또는 `NA`하고만 매칭됩니다.
//! - 리터럴끼리는 패턴 쪽의 비인용 `*`(0개 이상) / `?`(정확히 1개)
//!   와일드카드를 적용한 글롭 매칭입니다.

use std::fmt;
use std::str::FromStr;

use crate::quoting;

/// WFN 필드 하나의 값
///
/// `Value`는 소문자로 정규화된 인용 리터럴을 담습니다. 구두점은
/// 백슬래시로 인용되며(`windows_8\.1`), 비인용 `*`/`?`만 와일드카드로
/// 해석됩니다.
///
/// 파생된 `Ord`는 `Any < Na < Value` 순이며, [`Attributes`]의 필드
/// 순서와 함께 중복 제거에 쓰이는 사전식 전순서를 만듭니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    /// 모든 값과 매칭되는 특수값
    #[default]
    Any,
    /// "해당 없음" 특수값. `ANY` 또는 `NA`하고만 매칭됩니다.
    Na,
    /// 인용된 리터럴 (와일드카드 포함 가능)
    Value(String),
}

impl Component {
    /// 리터럴 값으로 컴포넌트를 생성합니다 (인용 형태 그대로).
    pub fn value(s: impl Into<String>) -> Self {
        Component::Value(s.into())
    }

    /// `ANY` 여부를 반환합니다.
    pub fn is_any(&self) -> bool {
        matches!(self, Component::Any)
    }

    /// `NA` 여부를 반환합니다.
    pub fn is_na(&self) -> bool {
        matches!(self, Component::Na)
    }

    /// 비인용 와일드카드(`*`/`?`)를 포함한 리터럴인지 반환합니다.
    pub fn has_wildcard(&self) -> bool {
        match self {
            Component::Value(s) => quoting::has_wildcard(s),
            _ => false,
        }
    }

    /// 캐시 키 인코딩에 쓰이는 문자열 형태를 반환합니다.
    ///
    /// `ANY`는 빈 문자열, `NA`는 `-`, 리터럴은 인용 형태 그대로입니다.
    /// 리터럴 대시는 `\-`로 인용되므로 이 인코딩은 단사(injective)입니다.
    pub fn as_key(&self) -> &str {
        match self {
            Component::Any => "",
            Component::Na => "-",
            Component::Value(s) => s.as_str(),
        }
    }

    /// 패턴(self)이 후보 값과 매칭되는지 평가합니다.
    pub fn matches(&self, candidate: &Component) -> bool {
        match (self, candidate) {
            (Component::Any, _) | (_, Component::Any) => true,
            (Component::Na, Component::Na) => true,
            (Component::Na, _) | (_, Component::Na) => false,
            (Component::Value(pattern), Component::Value(value)) => {
                if quoting::has_wildcard(pattern) {
                    quoting::wildcard_match(pattern, value)
                } else {
                    pattern == value
                }
            }
        }
    }
}

/// CPE 이름의 11개 필드 속성
///
/// 파싱 후에는 불변입니다. 필드 선언 순서가 캐시 키 인코딩과 중복 제거
/// 정렬의 사전식 순서를 결정합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attributes {
    /// 플랫폼 종류: 애플리케이션 `a`, 운영체제 `o`, 하드웨어 `h`
    pub part: Component,
    pub vendor: Component,
    pub product: Component,
    pub version: Component,
    pub update: Component,
    pub edition: Component,
    pub sw_edition: Component,
    pub target_sw: Component,
    pub target_hw: Component,
    pub other: Component,
    pub language: Component,
}

impl Attributes {
    /// 모든 필드가 `ANY`인 속성을 생성합니다.
    pub fn any() -> Self {
        Self::default()
    }

    /// URI 바인딩 또는 포맷 문자열 바인딩을 자동 판별하여 파싱합니다.
    pub fn parse(s: &str) -> Result<Self, crate::CpeError> {
        if s.starts_with(crate::formatted::PREFIX) {
            crate::formatted::parse_formatted(s)
        } else {
            crate::uri::parse_uri(s)
        }
    }

    /// 11개 필드 전체에 대해 매칭 관계를 평가합니다.
    pub fn matches(&self, candidate: &Attributes) -> bool {
        self.matches_without_version(candidate) && self.matches_only_version(candidate)
    }

    /// `version`을 제외한 10개 필드에 대해 매칭 관계를 평가합니다.
    ///
    /// 버전 범위 조건이 있는 leaf는 구조 매칭에서 버전을 `ANY`로
    /// 취급하므로 이 형태를 사용합니다.
    pub fn matches_without_version(&self, candidate: &Attributes) -> bool {
        self.part.matches(&candidate.part)
            && self.vendor.matches(&candidate.vendor)
            && self.product.matches(&candidate.product)
            && self.update.matches(&candidate.update)
            && self.edition.matches(&candidate.edition)
            && self.sw_edition.matches(&candidate.sw_edition)
            && self.target_sw.matches(&candidate.target_sw)
            && self.target_hw.matches(&candidate.target_hw)
            && self.other.matches(&candidate.other)
            && self.language.matches(&candidate.language)
    }

    /// `version` 필드만 매칭합니다.
    pub fn matches_only_version(&self, candidate: &Attributes) -> bool {
        self.version.matches(&candidate.version)
    }
}

/// canonical URI 바인딩 형태로 표시합니다.
impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::uri::bind_uri(self))
    }
}

impl FromStr for Attributes {
    type Err = crate::CpeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attributes::parse(s)
    }
}
