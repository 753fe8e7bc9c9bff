//! メッセージ本文のHTML化
//!
//! - `sanitize`: `< > " ' /` をHTMLエンティティに置換する
//! - `render`: エモートの出現位置（生テキスト基準のオフセット）を画像タグに置き換え、
//!   それ以外の平文部分はサニタイズする
//!
//! どちらも生テキストに対して1回だけ呼ぶこと。エスケープ後の文字列は文字数が変わるため、
//! 先にサニタイズしてから `render` に渡すとエモートのオフセットがずれる。

use super::types::EmotePlacement;

/// HTMLとして危険な文字をエスケープ
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

fn emote_tag(emote: &EmotePlacement) -> String {
    let url = sanitize(&emote.url);
    let name = sanitize(&emote.name);
    format!(
        r#"<img src="{url}" alt="{name}" class="emote" title="{name}" loading="lazy" />"#,
        url = url,
        name = name
    )
}

/// 生テキストとエモート情報から表示用HTMLを生成
///
/// オフセットは文字単位。範囲外のもの、他の出現位置と重なるものは無視して平文として扱う。
/// 置換は開始位置の降順（右端から）で行うため、左側のオフセットは常に有効なまま。
pub fn render(text: &str, emotes: &[EmotePlacement]) -> String {
    if emotes.is_empty() {
        return sanitize(text);
    }

    let chars: Vec<char> = text.chars().collect();

    let mut placements: Vec<(usize, usize, &EmotePlacement)> = emotes
        .iter()
        .flat_map(|emote| {
            emote
                .positions
                .iter()
                .map(move |&[start, end]| (start, end, emote))
        })
        .filter(|&(start, end, _)| start <= end && end < chars.len())
        .collect();
    placements.sort_by(|a, b| b.0.cmp(&a.0));

    // 右端から組み立て、最後に反転する
    let mut pieces: Vec<String> = Vec::with_capacity(placements.len() * 2 + 1);
    let mut cursor = chars.len();

    for (start, end, emote) in placements {
        if end >= cursor {
            log::debug!(
                "Skipping overlapping emote {} at {}-{}",
                emote.id,
                start,
                end
            );
            continue;
        }
        let tail: String = chars[end + 1..cursor].iter().collect();
        pieces.push(sanitize(&tail));
        pieces.push(emote_tag(emote));
        cursor = start;
    }

    let head: String = chars[..cursor].iter().collect();
    pieces.push(sanitize(&head));

    pieces.reverse();
    pieces.concat()
}

/// 指定範囲の生テキストを取り出す（文字単位、両端を含む）
pub fn slice_chars(text: &str, start: usize, end: usize) -> Option<String> {
    if start > end {
        return None;
    }
    let slice: String = text.chars().skip(start).take(end - start + 1).collect();
    if slice.chars().count() == end - start + 1 {
        Some(slice)
    } else {
        None
    }
}
