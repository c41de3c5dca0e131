use anyhow::Result;

pub fn is_valid_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        anyhow::bail!("并发下载数必须大于0");
    }
    Ok(())
}

pub fn validate_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        anyhow::bail!("URL列表不能为空");
    }
    for url in urls {
        if !is_valid_url(url) {
            anyhow::bail!("无效的URL: {}", url);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://example.com"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("invalid-url"));
    }

    #[test]
    fn test_limit_validation() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(0).is_err());
    }

    #[test]
    fn test_urls_validation() {
        assert!(validate_urls(&[]).is_err());
        assert!(validate_urls(&["https://example.com/a".to_string()]).is_ok());
        assert!(validate_urls(&["file:///etc/passwd".to_string()]).is_err());
    }
}
