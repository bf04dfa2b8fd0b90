//! Localized failure strings. Lookup never drives control flow; a missing
//! key falls back to English, then to the key itself.

pub const DEFAULT_LANG: &str = "en";

pub fn t(lang: &str, key: &str, namespace: Option<&str>) -> String {
    let full_key = match namespace {
        Some(ns) => format!("{ns}.{key}"),
        None => key.to_string(),
    };
    lookup(lang, &full_key)
        .or_else(|| lookup(DEFAULT_LANG, &full_key))
        .map(str::to_string)
        .unwrap_or(full_key)
}

fn lookup(lang: &str, key: &str) -> Option<&'static str> {
    match (lang, key) {
        ("en", "promotion.not-found") => Some("promotion does not exist or is no longer available"),
        ("en", "promotion.expired") => Some("promotion has expired"),
        ("en", "promotion.not-started") => Some("promotion has not started yet"),
        ("en", "promotion.product-missing") => Some("product is not part of this promotion"),
        ("en", "promotion.out-of-stock") => {
            Some("requested amount exceeds remaining promotional stock ({remaining})")
        }
        ("en", "promotion.limit-per-order") => {
            Some("requested amount exceeds the per-user purchase limit")
        }
        ("en", "promotion.limit-cumulative") => {
            Some("purchase limit for this promotion has been reached")
        }
        ("vi", "promotion.not-found") => {
            Some("chương trình khuyến mãi không tồn tại hoặc đã kết thúc")
        }
        ("vi", "promotion.expired") => Some("chương trình khuyến mãi đã hết hạn"),
        ("vi", "promotion.not-started") => Some("chương trình khuyến mãi chưa bắt đầu"),
        ("vi", "promotion.product-missing") => {
            Some("sản phẩm không thuộc chương trình khuyến mãi này")
        }
        ("vi", "promotion.out-of-stock") => {
            Some("số lượng yêu cầu vượt quá số lượng khuyến mãi còn lại ({remaining})")
        }
        ("vi", "promotion.limit-per-order") => Some("số lượng yêu cầu vượt quá giới hạn mua"),
        ("vi", "promotion.limit-cumulative") => Some("đã đạt giới hạn mua của chương trình này"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english_then_to_key() {
        assert_eq!(t("vi", "promotion.expired", None), "chương trình khuyến mãi đã hết hạn");
        assert_eq!(
            t("fr", "promotion.expired", None),
            "promotion has expired"
        );
        assert_eq!(t("en", "unknown-key", None), "unknown-key");
    }

    #[test]
    fn namespace_is_prepended() {
        assert_eq!(
            t("en", "expired", Some("promotion")),
            "promotion has expired"
        );
    }
}
