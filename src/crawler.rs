use log::debug;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use url::Url;

/// How many links are followed from each base page.
pub const SAMPLE_RANGE: RangeInclusive<usize> = 2..=5;

static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap());

/// Absolute http(s) links found in `html`, deduplicated.
pub fn extract_links(html: &[u8], base: &Url) -> BTreeSet<Url> {
    let text = String::from_utf8_lossy(html);
    let hrefs = match dom_hrefs(&text) {
        Some(hrefs) if !hrefs.is_empty() => hrefs,
        _ => {
            debug!("No anchors in parsed document for {}, scanning raw markup", base);
            raw_hrefs(&text)
        }
    };

    hrefs
        .iter()
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .collect()
}

/// Picks between 2 and 5 links uniformly without replacement, or all of them
/// when fewer are available.
pub fn sample_links<R: Rng>(links: &BTreeSet<Url>, rng: &mut R) -> Vec<Url> {
    let wanted = rng.gen_range(SAMPLE_RANGE);
    let pool: Vec<&Url> = links.iter().collect();
    pool.choose_multiple(rng, wanted.min(pool.len()))
        .map(|u| (*u).clone())
        .collect()
}

fn dom_hrefs(text: &str) -> Option<Vec<String>> {
    let selector = Selector::parse("a[href]").ok()?;
    let document = Html::parse_document(text);
    Some(
        document
            .select(&selector)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect(),
    )
}

fn raw_hrefs(text: &str) -> Vec<String> {
    HREF.captures_iter(text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn base() -> Url {
        Url::parse("https://example.com/docs/index.html").unwrap()
    }

    #[test]
    fn resolves_filters_and_dedups() {
        let html = br#"
            <html><body>
              <a href="/about">About</a>
              <a href="guide.html">Guide</a>
              <a href="https://example.com/about">About again</a>
              <a href="mailto:someone@example.com">Mail</a>
              <a href="javascript:void(0)">JS</a>
              <a href="ftp://files.example.com/x">FTP</a>
              <a name="anchor-without-href">none</a>
              <a href="http://other.example/">Other</a>
            </body></html>"#;

        let links: Vec<String> = extract_links(html, &base()).into_iter().map(String::from).collect();
        assert_eq!(
            links,
            vec![
                "http://other.example/",
                "https://example.com/about",
                "https://example.com/docs/guide.html",
            ]
        );
    }

    #[test]
    fn malformed_markup_does_not_abort() {
        let html = b"<html><a href='/one'>one<a href=\"/two\"<<<</div></table><a href=/three>";
        let links = extract_links(html, &base());
        assert!(links.contains(&Url::parse("https://example.com/one").unwrap()));
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        let mut html = b"<a href=\"/ok\">".to_vec();
        html.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        assert_eq!(extract_links(&html, &base()).len(), 1);
    }

    #[test]
    fn raw_scan_finds_quoted_and_bare_hrefs() {
        let hrefs = raw_hrefs(r#"<A HREF="/a"> <a class=x href='/b'> <a href=/c>"#);
        assert_eq!(hrefs, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn single_link_is_returned_whole() {
        let links: BTreeSet<Url> = [Url::parse("https://example.com/only").unwrap()].into();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(sample_links(&links, &mut rng), vec![Url::parse("https://example.com/only").unwrap()]);
        }
    }

    #[test]
    fn empty_set_samples_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(sample_links(&BTreeSet::new(), &mut rng).is_empty());
    }

    #[test]
    fn sample_size_within_range_and_unique() {
        let links: BTreeSet<Url> = (0..10)
            .map(|i| Url::parse(&format!("https://example.com/p{}", i)).unwrap())
            .collect();
        let mut seen_sizes = BTreeSet::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sample = sample_links(&links, &mut rng);
            assert!(SAMPLE_RANGE.contains(&sample.len()));
            let unique: BTreeSet<_> = sample.iter().collect();
            assert_eq!(unique.len(), sample.len());
            assert!(sample.iter().all(|u| links.contains(u)));
            seen_sizes.insert(sample.len());
        }
        assert_eq!(seen_sizes.into_iter().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn same_seed_same_sample() {
        let links: BTreeSet<Url> = (0..10)
            .map(|i| Url::parse(&format!("https://example.com/p{}", i)).unwrap())
            .collect();
        let a = sample_links(&links, &mut StdRng::seed_from_u64(42));
        let b = sample_links(&links, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
