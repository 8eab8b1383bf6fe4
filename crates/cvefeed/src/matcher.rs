//! 구성 트리 평가 -- 인벤토리에 대한 재귀 매칭
//!
//! 인벤토리(입력 레코드의 CPE 속성 목록)를 레코드의 루트 노드들에
//! 대해 평가합니다. 결과는 매칭 여부와, 참이 된 leaf를 유발한 인벤토리
//! 속성들의 집합입니다.
//!
//! 평가 규칙:
//!
//! - OR 노드는 처음 참이 되는 자식에서 단락(short-circuit)합니다.
//! - AND 노드는 처음 거짓이 되는 자식에서 단락합니다.
//! - 노드에 붙은 leaf는 자식 결과에 OR로 결합되며, 매칭된 인벤토리
//!   속성을 수집기에 추가합니다.
//! - negate는 노드의 최종 불리언만 반전합니다. 수집기는 부분적으로
//!   참이었던 경로의 속성을 그대로 유지합니다.
//! - 루트 노드들은 전부 평가되며 최종 집합은 그 합집합입니다.
//!
//! 이 모듈의 함수는 실패하지 않습니다.

use cvegate_wfn::Attributes;

use crate::node::{LogicalNode, Operator};

/// 인벤토리를 루트 노드들에 대해 평가합니다.
///
/// 매칭되면 유발 속성들의 목록을 돌려줍니다 (중복 제거 전). 매칭되지
/// 않으면 `None`입니다.
pub fn match_inventory<'a>(
    inventory: &[&'a Attributes],
    rules: &[LogicalNode],
    require_version: bool,
) -> Option<Vec<&'a Attributes>> {
    let mut collected = Vec::new();
    let mut matched = false;
    for node in rules {
        if match_node(&mut collected, inventory, node, require_version) {
            matched = true;
        }
    }
    matched.then_some(collected)
}

fn match_node<'a>(
    collected: &mut Vec<&'a Attributes>,
    inventory: &[&'a Attributes],
    node: &LogicalNode,
    require_version: bool,
) -> bool {
    let mut matched = false;
    match node.operator {
        Operator::Or => {
            for child in &node.children {
                if match_node(collected, inventory, child, require_version) {
                    return node.negate_if_needed(true);
                }
            }
        }
        Operator::And => {
            for child in &node.children {
                if !match_node(collected, inventory, child, require_version) {
                    return node.negate_if_needed(false);
                }
                matched = true;
            }
        }
    }
    for attrs in inventory {
        if node.match_platform(attrs, require_version) {
            collected.push(attrs);
            matched = true;
        }
    }
    node.negate_if_needed(matched)
}

/// 사전식 전순서로 정렬하고 중복을 제거합니다.
pub fn dedup_attributes(mut attrs: Vec<Attributes>) -> Vec<Attributes> {
    attrs.sort();
    attrs.dedup();
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CpeMatch;
    use cvegate_wfn::parse_uri;

    fn leaf(uri: &str) -> CpeMatch {
        CpeMatch::new(parse_uri(uri).unwrap())
    }

    fn or_leaves(uris: &[&str]) -> LogicalNode {
        LogicalNode::or(vec![], uris.iter().map(|u| leaf(u)).collect())
    }

    fn attrs(uri: &str) -> Attributes {
        parse_uri(uri).unwrap()
    }

    #[test]
    fn or_node_matches_any_leaf() {
        let rules = vec![or_leaves(&[
            "cpe:/o:microsoft:windows_10",
            "cpe:/o:microsoft:windows_7::sp1",
        ])];
        let win10 = attrs("cpe:/o:microsoft:windows_10:-");
        let inventory = vec![&win10];

        let matches = match_inventory(&inventory, &rules, false).unwrap();
        assert_eq!(matches, vec![&win10]);
    }

    #[test]
    fn and_node_requires_all_children() {
        let rules = vec![LogicalNode::and(
            vec![
                or_leaves(&["cpe:/o:microsoft:windows_10"]),
                or_leaves(&["cpe:/a:adobe:flash_player:24.0.0.194"]),
            ],
            vec![],
        )];

        let windows = attrs("cpe:/o:microsoft:windows_10:-");
        let flash = attrs("cpe:/a:adobe:flash_player:24.0.0.194");

        // 한쪽만 있으면 매칭 안 됨
        assert!(match_inventory(&[&windows], &rules, false).is_none());

        // 둘 다 있으면 둘 다 수집됨
        let matches = match_inventory(&[&windows, &flash], &rules, false).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn negate_flips_boolean_only() {
        let rules = vec![
            or_leaves(&["cpe:/o:microsoft:windows_10"]),
            or_leaves(&["cpe:/a:vendor:absent"]).negated(),
        ];
        let windows = attrs("cpe:/o:microsoft:windows_10");
        let matches = match_inventory(&[&windows], &rules, false).unwrap();
        assert_eq!(matches, vec![&windows]);
    }

    #[test]
    fn negated_and_blocks_override_subset() {
        // base AND NOT override 합성 형태
        let rules = vec![LogicalNode::and(
            vec![
                LogicalNode::or(vec![or_leaves(&["cpe:/o:linux:linux_kernel"])], vec![]),
                LogicalNode::or(vec![or_leaves(&["cpe:/o:linux:linux_kernel:4.4"])], vec![])
                    .negated(),
            ],
            vec![],
        )];

        let patched = attrs("cpe:/o:linux:linux_kernel:4.4");
        let unpatched = attrs("cpe:/o:linux:linux_kernel:4.2");

        assert!(match_inventory(&[&patched], &rules, false).is_none());
        assert!(match_inventory(&[&unpatched], &rules, false).is_some());
    }

    #[test]
    fn all_roots_contribute() {
        let rules = vec![
            or_leaves(&["cpe:/o:microsoft:windows_10"]),
            or_leaves(&["cpe:/a:adobe:flash_player:24.0.0.194"]),
        ];
        let windows = attrs("cpe:/o:microsoft:windows_10");
        let flash = attrs("cpe:/a:adobe:flash_player:24.0.0.194");
        let matches = match_inventory(&[&windows, &flash], &rules, false).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn empty_inventory_matches_nothing() {
        let rules = vec![or_leaves(&["cpe:/o:microsoft:windows_10"])];
        assert!(match_inventory(&[], &rules, false).is_none());
    }

    #[test]
    fn require_version_filters_any_version_leaves() {
        let rules = vec![or_leaves(&["cpe:/h:huaweidevice:d100"])];
        let device = attrs("cpe:/h:huaweidevice:d100:1.33.7");
        assert!(match_inventory(&[&device], &rules, false).is_some());
        assert!(match_inventory(&[&device], &rules, true).is_none());
    }

    #[test]
    fn dedup_removes_duplicates_in_order() {
        let a = attrs("cpe:/a:adobe:flash_player:24.0.0.194");
        let o = attrs("cpe:/o:microsoft:windows_10");
        let deduped = dedup_attributes(vec![o.clone(), a.clone(), o.clone()]);
        assert_eq!(deduped, vec![a, o]);
    }
}
