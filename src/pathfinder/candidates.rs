//! 후보 경로 열거
//!
//! 풀 그래프 전체를 탐색하지 않는다. 직접 페어, 래핑 네이티브 경유,
//! 기준 자산 경유, 그리고 서로 다른 두 기준 자산을 조합한 3홉까지만
//! 생성하며 전체 개수는 상수로 제한된다.

use std::collections::HashSet;

use alloy::primitives::Address;

use crate::constants::MAX_CANDIDATE_PATHS;

/// token_in -> token_out 후보 경로 생성.
/// 모든 경로는 중복 토큰이 없고 홉 수가 3 이하다.
pub fn build(
    token_in: Address,
    token_out: Address,
    wrapped_native: Address,
    reference_assets: &[Address],
) -> Vec<Vec<Address>> {
    let mut seen: HashSet<Vec<Address>> = HashSet::new();
    let mut paths: Vec<Vec<Address>> = Vec::new();

    let mut push = |path: Vec<Address>, paths: &mut Vec<Vec<Address>>| {
        if paths.len() >= MAX_CANDIDATE_PATHS {
            return;
        }
        if has_duplicates(&path) {
            return;
        }
        if seen.insert(path.clone()) {
            paths.push(path);
        }
    };

    // 직접 페어
    push(vec![token_in, token_out], &mut paths);

    // 경유 토큰: 래핑 네이티브를 앞세우고 기준 자산을 뒤에
    let mut intermediates: Vec<Address> = Vec::with_capacity(reference_assets.len() + 1);
    intermediates.push(wrapped_native);
    for asset in reference_assets {
        if !intermediates.contains(asset) {
            intermediates.push(*asset);
        }
    }
    intermediates.retain(|mid| *mid != token_in && *mid != token_out);

    // 2홉
    for mid in &intermediates {
        push(vec![token_in, *mid, token_out], &mut paths);
    }

    // 3홉: 서로 다른 두 경유 토큰의 순서 조합
    for first in &intermediates {
        for second in &intermediates {
            if first == second {
                continue;
            }
            push(vec![token_in, *first, *second, token_out], &mut paths);
        }
    }

    paths
}

fn has_duplicates(path: &[Address]) -> bool {
    let mut seen = HashSet::with_capacity(path.len());
    path.iter().any(|token| !seen.insert(*token))
}
