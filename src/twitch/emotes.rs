use std::collections::BTreeMap;

use crate::chat::render::slice_chars;
use crate::chat::EmotePlacement;

const EMOTE_CDN: &str = "https://static-cdn.jtvnw.net/emoticons/v2";

/// エモートIDから画像URLを生成
pub fn emote_url(emote_id: &str) -> String {
    format!("{}/{}/default/dark/1.0", EMOTE_CDN, emote_id)
}

/// `"start-end"` 形式の範囲を数値の組に変換
pub fn parse_range(range: &str) -> Option<(usize, usize)> {
    let (start, end) = range.trim().split_once('-')?;
    let start = start.parse().ok()?;
    let end = end.parse().ok()?;
    (start <= end).then_some((start, end))
}

/// エモートID → 範囲文字列の一覧 から出現位置ごとのエモート情報を生成
///
/// 同じエモートが複数回使われた場合も出現ごとに1件ずつ生成する（IDでまとめない）。
/// エモート名は生メッセージの該当範囲から取り出す。範囲が不正なものは読み飛ばす。
pub fn process_emotes(message: &str, emotes: &BTreeMap<String, Vec<String>>) -> Vec<EmotePlacement> {
    let mut placements = Vec::new();

    for (emote_id, ranges) in emotes {
        for range in ranges {
            let Some((start, end)) = parse_range(range) else {
                log::debug!("Ignoring malformed emote range {:?} for {}", range, emote_id);
                continue;
            };
            let Some(name) = slice_chars(message, start, end) else {
                log::debug!("Emote range {} is outside message for {}", range, emote_id);
                continue;
            };

            placements.push(EmotePlacement {
                id: emote_id.clone(),
                name,
                url: emote_url(emote_id),
                positions: vec![[start, end]],
            });
        }
    }

    placements
}
