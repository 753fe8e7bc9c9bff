/// APIキーやトークンをマスキングしてログ出力用の文字列を生成
///
/// 最初の4文字と最後の4文字のみを表示し、中間を***でマスキング
///
/// # Examples
/// ```
/// use chat_hub_lib::util::mask_api_key;
///
/// let masked = mask_api_key("AIzaSyABC123def456GHI789");
/// assert_eq!(masked, "AIza***I789");
/// ```
pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 8 {
        // 短いキーは全体をマスク
        return "***".to_string();
    }

    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", prefix, suffix)
}

/// ユーザー名から表示色を決定的に生成
///
/// UTF-16コード単位ごとに `hash = c + ((hash << 5) - hash)` を計算し、
/// その絶対値を360で割った余りを色相とする。
/// 32bitに切り詰めるのはシフト演算の部分だけで、加減算は折り返さない。
///
/// # Examples
/// ```
/// use chat_hub_lib::util::username_color;
///
/// assert_eq!(username_color(""), "hsl(0, 70%, 60%)");
/// assert_eq!(username_color("a"), "hsl(97, 70%, 60%)");
/// ```
pub fn username_color(username: &str) -> String {
    let hash = username.encode_utf16().fold(0i64, |hash, unit| {
        // 下位32bitを符号付きとして解釈してからシフト
        let shifted = (hash as i32).wrapping_shl(5) as i64;
        unit as i64 + shifted - hash
    });

    let hue = hash.unsigned_abs() % 360;
    format!("hsl({}, 70%, 60%)", hue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        // 通常のキー
        assert_eq!(mask_api_key("AIzaSyABC123def456GHI789"), "AIza***I789");

        // 短いキー
        assert_eq!(mask_api_key("short"), "***");

        // 空文字列
        assert_eq!(mask_api_key(""), "***");

        // 8文字ちょうど
        assert_eq!(mask_api_key("12345678"), "***");

        // 9文字（マスキング開始）
        assert_eq!(mask_api_key("123456789"), "1234***6789");
    }

    #[test]
    fn test_username_color_is_deterministic() {
        assert_eq!(username_color("StreamerFan1"), username_color("StreamerFan1"));
        assert_ne!(username_color("StreamerFan1"), username_color("ChatMod"));
    }

    #[test]
    fn test_username_color_known_values() {
        // "ab" = 98 + ((97 << 5) - 97) = 3105 → 3105 % 360 = 225
        assert_eq!(username_color("ab"), "hsl(225, 70%, 60%)");
    }

    #[test]
    fn test_username_color_past_32bit_range() {
        // ハッシュが32bitを超える名前
        assert_eq!(username_color("Viewer123"), "hsl(240, 70%, 60%)");
        assert_eq!(username_color("abcdefghij"), "hsl(75, 70%, 60%)");
        assert_eq!(username_color("StreamerFan1"), "hsl(349, 70%, 60%)");
        assert_eq!(username_color("日本語ユーザー"), "hsl(333, 70%, 60%)");
        assert_eq!(username_color(&"a".repeat(64)), "hsl(216, 70%, 60%)");
    }
}
