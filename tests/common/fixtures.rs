//! Atom feed fixtures and generators

/// Realistic EDGAR "current filings" document with three Form 144 entries
pub const EDGAR_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Latest Filings - Tue, 02 Jan 2024 14:30:00 EST</title>
  <link rel="alternate" href="/cgi-bin/browse-edgar?action=getcurrent"/>
  <link rel="self" href="/cgi-bin/browse-edgar?action=getcurrent&amp;type=144&amp;output=atom"/>
  <id>https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent</id>
  <author><name>Webmaster</name><email>webmaster@sec.gov</email></author>
  <updated>2024-01-02T14:30:00-05:00</updated>
  <entry>
    <title>144 - Acme Widgets Inc (0001000001) (Subject)</title>
    <link rel="alternate" type="text/html" href="/Archives/edgar/data/1000001/000100000124000001-index.htm"/>
    <summary type="html"> &lt;b&gt;Filed:&lt;/b&gt; 2024-01-02 &lt;b&gt;AccNo:&lt;/b&gt; 0001000001-24-000001 &lt;b&gt;Size:&lt;/b&gt; 5 KB</summary>
    <updated>2024-01-02T14:29:41-05:00</updated>
    <category scheme="https://www.sec.gov/" label="form type" term="144"/>
    <id>urn:tag:sec.gov,2008:accession-number=0001000001-24-000001</id>
  </entry>
  <entry>
    <title>144 - Smith &amp;amp; Jones Holdings (0001000002) (Subject)</title>
    <link rel="alternate" type="text/html" href="/Archives/edgar/data/1000002/000100000224000002-index.htm"/>
    <summary type="html"> &lt;b&gt;Filed:&lt;/b&gt; 2024-01-02 &lt;b&gt;AccNo:&lt;/b&gt; 0001000002-24-000002 &lt;b&gt;Size:&lt;/b&gt; 4 KB</summary>
    <updated>2024-01-02T14:21:03-05:00</updated>
    <category scheme="https://www.sec.gov/" label="form type" term="144"/>
    <id>urn:tag:sec.gov,2008:accession-number=0001000002-24-000002</id>
  </entry>
  <entry>
    <title>144 - Example Biotech Corp (0001000003) (Subject)</title>
    <link rel="alternate" type="text/html" href="/Archives/edgar/data/1000003/000100000324000003-index.htm"/>
    <summary type="html"> &lt;b&gt;Filed:&lt;/b&gt; 2024-01-02 &lt;b&gt;AccNo:&lt;/b&gt; 0001000003-24-000003 &lt;b&gt;Size:&lt;/b&gt; 6 KB</summary>
    <updated>2024-01-02T14:02:55-05:00</updated>
    <category scheme="https://www.sec.gov/" label="form type" term="144"/>
    <id>urn:tag:sec.gov,2008:accession-number=0001000003-24-000003</id>
  </entry>
</feed>"#;

/// Archive paths of the entries in [`EDGAR_FEED`], in document order
pub const EDGAR_FEED_PATHS: [&str; 3] = [
    "/Archives/edgar/data/1000001/000100000124000001-index.htm",
    "/Archives/edgar/data/1000002/000100000224000002-index.htm",
    "/Archives/edgar/data/1000003/000100000324000003-index.htm",
];

/// Build a feed document from `(title, href, summary)` triples
pub fn atom_feed(entries: &[(&str, &str, &str)]) -> String {
    let mut doc = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<feed xmlns=\"http://www.w3.org/2005/Atom\">\n  <title>Generated</title>\n",
    );
    for (title, href, summary) in entries {
        doc.push_str(&format!(
            "  <entry>\n    <title>{}</title>\n    <link rel=\"alternate\" href=\"{}\"/>\n    <summary>{}</summary>\n  </entry>\n",
            title, href, summary
        ));
    }
    doc.push_str("</feed>");
    doc
}
