//! 제품명 역색인 -- 후보 레코드 프리필터
//!
//! 각 레코드의 구성 트리에 등장하는 제품명으로 레코드를 버킷에
//! 넣습니다. `ANY`이거나 와일드카드를 포함한 제품은 구별된 와일드카드
//! 버킷에 들어갑니다.
//!
//! 조회는 인벤토리 제품들의 리터럴 버킷과 와일드카드 버킷(항상)의
//! 합집합입니다. 인덱스가 돌려주지 않은 레코드는 해당 인벤토리와
//! 매칭될 수 없습니다 -- 보수적 프리필터입니다.
//!
//! # 재현율 주의
//!
//! 와일드카드 제품 leaf를 가진 레코드가 같은 레코드 안에 리터럴 제품
//! leaf도 갖고 있으면 리터럴 버킷을 통해서도 도달되지만, 와일드카드
//! leaf 자체는 와일드카드 버킷을 통해서만 보입니다. 와일드카드 버킷을
//! 항상 조회하는 이유입니다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cvegate_wfn::{Attributes, Component};

use crate::dictionary::Dictionary;
use crate::vuln::VulnRecord;

/// 와일드카드 버킷 키 (`ANY` 제품의 키 형태)
const WILDCARD_BUCKET: &str = "";

/// 제품명 -> 레코드 역색인
pub struct ProductIndex {
    buckets: HashMap<String, Vec<Arc<VulnRecord>>>,
}

impl ProductIndex {
    /// 사전을 스캔하여 인덱스를 구축합니다.
    pub fn build(dict: &Dictionary) -> Self {
        let mut buckets: HashMap<String, Vec<Arc<VulnRecord>>> = HashMap::new();
        for record in dict.records() {
            let mut products: HashSet<&str> = HashSet::new();
            let mut cpes = Vec::new();
            for node in record.config() {
                node.collect_cpes(&mut cpes);
            }
            for attrs in cpes {
                match &attrs.product {
                    Component::Value(p) if !attrs.product.has_wildcard() => {
                        products.insert(p.as_str());
                    }
                    // ANY / NA / 와일드카드 제품은 와일드카드 버킷으로
                    _ => {
                        products.insert(WILDCARD_BUCKET);
                    }
                }
            }
            for product in products {
                buckets
                    .entry(product.to_owned())
                    .or_default()
                    .push(Arc::clone(record));
            }
        }
        Self { buckets }
    }

    /// 인벤토리에 대한 후보 레코드를 반환합니다.
    ///
    /// 최초 등장 순서를 유지하며 레코드 단위로 중복을 제거합니다.
    pub fn candidates(&self, inventory: &[&Attributes]) -> Vec<Arc<VulnRecord>> {
        let mut seen: HashSet<*const VulnRecord> = HashSet::new();
        let mut out = Vec::new();
        let mut take = |records: &[Arc<VulnRecord>], out: &mut Vec<Arc<VulnRecord>>| {
            for record in records {
                if seen.insert(Arc::as_ptr(record)) {
                    out.push(Arc::clone(record));
                }
            }
        };

        for attrs in inventory {
            if let Component::Value(product) = &attrs.product
                && let Some(bucket) = self.buckets.get(product.as_str())
            {
                take(bucket, &mut out);
            }
        }
        if let Some(bucket) = self.buckets.get(WILDCARD_BUCKET) {
            take(bucket, &mut out);
        }
        out
    }

    /// (리터럴 버킷 레코드 수, 전체 버킷 레코드 수)를 반환합니다.
    ///
    /// 인덱스 효용 로깅에 사용합니다.
    pub fn coverage(&self) -> (usize, usize) {
        let mut named = 0;
        let mut total = 0;
        for (key, bucket) in &self.buckets {
            if key != WILDCARD_BUCKET {
                named += bucket.len();
            }
            total += bucket.len();
        }
        (named, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{CpeMatch, LogicalNode};
    use crate::vuln::Vulnerability;
    use cvegate_wfn::parse_uri;

    fn record(id: &str, uris: &[&str]) -> Arc<VulnRecord> {
        let leaves = uris
            .iter()
            .map(|u| CpeMatch::new(parse_uri(u).unwrap()))
            .collect();
        Arc::new(VulnRecord::new(id, vec![LogicalNode::or(vec![], leaves)]))
    }

    fn sample_dict() -> Dictionary {
        Dictionary::from_records(vec![
            record("CVE-1", &["cpe:/o:microsoft:windows_10"]),
            record("CVE-2", &["cpe:/a:adobe:flash_player:24.0.0.194"]),
            record("CVE-3", &["cpe:/a:vendor:prod%02"]),
            record(
                "CVE-4",
                &["cpe:/o:microsoft:windows_10", "cpe:/a:adobe:flash_player:24.0.0.194"],
            ),
        ])
    }

    #[test]
    fn literal_products_bucketed() {
        let index = ProductIndex::build(&sample_dict());
        let windows = parse_uri("cpe:/o:microsoft:windows_10").unwrap();
        let candidates = index.candidates(&[&windows]);
        let ids: Vec<&str> = candidates.iter().map(|r| r.id()).collect();
        // windows 버킷의 CVE-1, CVE-4와 와일드카드 버킷의 CVE-3
        assert_eq!(ids, vec!["CVE-1", "CVE-4", "CVE-3"]);
    }

    #[test]
    fn wildcard_bucket_always_consulted() {
        let index = ProductIndex::build(&sample_dict());
        let unrelated = parse_uri("cpe:/a:nobody:nothing").unwrap();
        let candidates = index.candidates(&[&unrelated]);
        let ids: Vec<&str> = candidates.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["CVE-3"]);
    }

    #[test]
    fn records_deduplicated_across_buckets() {
        let index = ProductIndex::build(&sample_dict());
        let windows = parse_uri("cpe:/o:microsoft:windows_10").unwrap();
        let flash = parse_uri("cpe:/a:adobe:flash_player:24.0.0.194").unwrap();
        let candidates = index.candidates(&[&windows, &flash]);
        // CVE-4는 두 버킷에 있지만 한 번만
        assert_eq!(candidates.len(), 4);
    }

    #[test]
    fn any_product_inventory_hits_only_wildcard_bucket() {
        let index = ProductIndex::build(&sample_dict());
        let anon = parse_uri("cpe:/a:vendor").unwrap();
        assert!(anon.product.is_any());
        let candidates = index.candidates(&[&anon]);
        let ids: Vec<&str> = candidates.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["CVE-3"]);
    }

    #[test]
    fn coverage_counts() {
        let index = ProductIndex::build(&sample_dict());
        let (named, total) = index.coverage();
        assert_eq!(total - named, 1); // 와일드카드 버킷에 CVE-3 하나
        assert_eq!(named, 4); // windows_10: 2, flash_player: 2
    }
}
