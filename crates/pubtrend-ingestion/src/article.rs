//! Article records and efetch XML parsing.
//!
//! Handles the `<PubmedArticleSet><PubmedArticle>` structure returned by
//! efetch in abstract mode. Malformed records are skipped with a warning and
//! never fail the batch.

use lazy_static::lazy_static;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use pubtrend_common::PubtrendError;

lazy_static! {
    // MedlineDate values like "1998 Dec-1999 Jan" or "2000 Spring" carry the
    // year only as free text.
    static ref MEDLINE_YEAR: Regex = Regex::new(r"\b(1[5-9]\d{2}|2\d{3})\b").unwrap();
}

/// Publication date as indexed by the service. Often partial: year only, or
/// year and month, with month sometimes a name ("Dec") rather than a number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubDate {
    pub year: Option<i32>,
    pub month: Option<String>,
    pub day: Option<String>,
}

impl PubDate {
    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }

    /// "2021 Dec 14" style, trimmed to the fields present.
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(y) = self.year {
            parts.push(y.to_string());
        }
        if let Some(m) = &self.month {
            parts.push(m.clone());
        }
        if let Some(d) = &self.day {
            parts.push(d.clone());
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    pub agency: String,
}

impl Grant {
    /// Tally key used by the aggregation layer: `"<id> (<agency>)"`.
    pub fn tally_key(&self) -> String {
        format!("{} ({})", self.id, self.agency)
    }
}

/// One parsed publication record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable external identifier.
    pub pmid: String,
    pub title: String,
    /// "LastName, ForeName" per author, in listed order.
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub pub_date: PubDate,
    pub abstract_text: Option<String>,
    pub grants: Vec<Grant>,
    pub mesh_terms: Vec<String>,
    /// Article-level affiliation set, first-seen order, deduplicated.
    pub affiliations: Vec<String>,
    pub publication_types: Vec<String>,
    pub keywords: Vec<String>,
    pub doi: Option<String>,
}

fn author_name(last: &str, fore: &str) -> String {
    match (last.is_empty(), fore.is_empty()) {
        (false, false) => format!("{last}, {fore}"),
        (false, true) => last.to_string(),
        (true, false) => fore.to_string(),
        (true, true) => String::new(),
    }
}

/// Parse efetch XML into article records.
///
/// Records without a PMID are dropped. A reader error ends parsing early and
/// returns whatever was complete up to that point.
pub fn parse_article_set(xml: &str) -> Vec<Article> {
    let mut articles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // State machine for XML parsing
    let mut current: Option<Article> = None;
    let mut in_pmid = false;
    let mut in_title = false;
    let mut in_abstract = false;
    let mut in_author = false;
    let mut in_last_name = false;
    let mut in_fore_name = false;
    let mut in_collective = false;
    let mut in_affiliation = false;
    let mut in_journal = false;
    let mut in_journal_title = false;
    let mut in_pub_date = false;
    let mut in_year = false;
    let mut in_month = false;
    let mut in_day = false;
    let mut in_medline_date = false;
    let mut in_grant = false;
    let mut in_grant_id = false;
    let mut in_agency = false;
    let mut in_descriptor = false;
    let mut in_pub_type = false;
    let mut in_keyword = false;
    let mut in_doi_id = false;
    let mut current_last = String::new();
    let mut current_fore = String::new();
    let mut current_grant = Grant::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"PubmedArticle" => current = Some(Article::default()),
                b"PMID" => in_pmid = true,
                b"ArticleTitle" => in_title = true,
                b"AbstractText" => in_abstract = true,
                b"Author" => {
                    in_author = true;
                    current_last.clear();
                    current_fore.clear();
                }
                b"LastName" => in_last_name = true,
                b"ForeName" => in_fore_name = true,
                b"CollectiveName" => in_collective = true,
                b"Affiliation" => in_affiliation = true,
                b"Journal" => in_journal = true,
                b"Title" if in_journal => in_journal_title = true,
                b"PubDate" => in_pub_date = true,
                b"Year" if in_pub_date => in_year = true,
                b"Month" if in_pub_date => in_month = true,
                b"Day" if in_pub_date => in_day = true,
                b"MedlineDate" if in_pub_date => in_medline_date = true,
                b"Grant" => {
                    in_grant = true;
                    current_grant = Grant::default();
                }
                b"GrantID" if in_grant => in_grant_id = true,
                b"Agency" if in_grant => in_agency = true,
                b"DescriptorName" => in_descriptor = true,
                b"PublicationType" => in_pub_type = true,
                b"Keyword" => in_keyword = true,
                b"ArticleId" => {
                    in_doi_id = e.attributes().flatten().any(|a| {
                        a.key.as_ref() == b"IdType" && a.value.as_ref() == b"doi"
                    });
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if let Some(ref mut a) = current {
                    if in_pmid && a.pmid.is_empty() {
                        // Reference lists carry PMIDs too; the first one is
                        // the article's own.
                        a.pmid = text.clone();
                    }
                    if in_title {
                        a.title = text.clone();
                    }
                    if in_abstract {
                        match &mut a.abstract_text {
                            Some(existing) => {
                                existing.push(' ');
                                existing.push_str(&text);
                            }
                            None => a.abstract_text = Some(text.clone()),
                        }
                    }
                    if in_last_name {
                        current_last = text.clone();
                    }
                    if in_fore_name {
                        current_fore = text.clone();
                    }
                    if in_collective && in_author {
                        current_last = text.clone();
                    }
                    if in_affiliation && !a.affiliations.contains(&text) {
                        a.affiliations.push(text.clone());
                    }
                    if in_journal_title {
                        a.journal = Some(text.clone());
                    }
                    if in_year && a.pub_date.year.is_none() {
                        a.pub_date.year = text.parse().ok();
                    }
                    if in_month {
                        a.pub_date.month = Some(text.clone());
                    }
                    if in_day {
                        a.pub_date.day = Some(text.clone());
                    }
                    if in_medline_date && a.pub_date.year.is_none() {
                        a.pub_date.year = MEDLINE_YEAR
                            .find(&text)
                            .and_then(|m| m.as_str().parse().ok());
                    }
                    if in_grant_id {
                        current_grant.id = text.clone();
                    }
                    if in_agency {
                        current_grant.agency = text.clone();
                    }
                    if in_descriptor {
                        a.mesh_terms.push(text.clone());
                    }
                    if in_pub_type {
                        a.publication_types.push(text.clone());
                    }
                    if in_keyword {
                        a.keywords.push(text.clone());
                    }
                    if in_doi_id && a.doi.is_none() {
                        a.doi = Some(text.clone());
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"PMID" => in_pmid = false,
                b"ArticleTitle" => in_title = false,
                b"AbstractText" => in_abstract = false,
                b"LastName" => in_last_name = false,
                b"ForeName" => in_fore_name = false,
                b"CollectiveName" => in_collective = false,
                b"Affiliation" => in_affiliation = false,
                b"Journal" => in_journal = false,
                b"Title" => in_journal_title = false,
                b"PubDate" => in_pub_date = false,
                b"Year" => in_year = false,
                b"Month" => in_month = false,
                b"Day" => in_day = false,
                b"MedlineDate" => in_medline_date = false,
                b"GrantID" => in_grant_id = false,
                b"Agency" => in_agency = false,
                b"DescriptorName" => in_descriptor = false,
                b"PublicationType" => in_pub_type = false,
                b"Keyword" => in_keyword = false,
                b"ArticleId" => in_doi_id = false,
                b"Author" => {
                    if in_author {
                        if let Some(ref mut a) = current {
                            let name = author_name(&current_last, &current_fore);
                            if !name.is_empty() {
                                a.authors.push(name);
                            }
                        }
                        in_author = false;
                    }
                }
                b"Grant" => {
                    if in_grant {
                        if let Some(ref mut a) = current {
                            if !current_grant.id.is_empty() || !current_grant.agency.is_empty() {
                                a.grants.push(std::mem::take(&mut current_grant));
                            }
                        }
                        in_grant = false;
                    }
                }
                b"PubmedArticle" => {
                    if let Some(a) = current.take() {
                        if a.pmid.is_empty() {
                            let err = PubtrendError::Parse(
                                "article record without PMID".to_string(),
                            );
                            warn!(%err, "skipping record");
                        } else {
                            articles.push(a);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("XML parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    articles
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RECORD: &str = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>31452104</PMID>
      <Article>
        <Journal>
          <Title>Medical Physics</Title>
          <JournalIssue>
            <PubDate><Year>2019</Year><Month>Dec</Month><Day>14</Day></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Output calibration of a clinical linear accelerator</ArticleTitle>
        <Abstract>
          <AbstractText Label="PURPOSE">Measure output.</AbstractText>
          <AbstractText Label="METHODS">Ion chamber.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author>
            <LastName>Nilsson</LastName>
            <ForeName>Anna</ForeName>
            <AffiliationInfo>
              <Affiliation>Varian Medical Systems, Palo Alto</Affiliation>
            </AffiliationInfo>
          </Author>
          <Author>
            <LastName>Okafor</LastName>
            <ForeName>Chidi</ForeName>
            <AffiliationInfo>
              <Affiliation>Varian Medical Systems, Palo Alto</Affiliation>
            </AffiliationInfo>
          </Author>
        </AuthorList>
        <GrantList>
          <Grant>
            <GrantID>R01CA987654</GrantID>
            <Agency>NCI NIH HHS</Agency>
          </Grant>
        </GrantList>
        <PublicationTypeList>
          <PublicationType>Journal Article</PublicationType>
        </PublicationTypeList>
      </Article>
      <MeshHeadingList>
        <MeshHeading>
          <DescriptorName>Radiotherapy Dosage</DescriptorName>
          <QualifierName>standards</QualifierName>
        </MeshHeading>
        <MeshHeading>
          <DescriptorName>Particle Accelerators</DescriptorName>
        </MeshHeading>
      </MeshHeadingList>
      <KeywordList>
        <Keyword>dosimetry</Keyword>
      </KeywordList>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">31452104</ArticleId>
        <ArticleId IdType="doi">10.1002/mp.13394</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_full_record() {
        let articles = parse_article_set(FULL_RECORD);
        assert_eq!(articles.len(), 1);
        let a = &articles[0];
        assert_eq!(a.pmid, "31452104");
        assert_eq!(a.title, "Output calibration of a clinical linear accelerator");
        assert_eq!(a.authors, vec!["Nilsson, Anna", "Okafor, Chidi"]);
        assert_eq!(a.journal.as_deref(), Some("Medical Physics"));
        assert_eq!(a.pub_date.year, Some(2019));
        assert_eq!(a.pub_date.display(), "2019 Dec 14");
        assert_eq!(a.abstract_text.as_deref(), Some("Measure output. Ion chamber."));
        assert_eq!(a.grants[0].tally_key(), "R01CA987654 (NCI NIH HHS)");
        assert_eq!(a.mesh_terms, vec!["Radiotherapy Dosage", "Particle Accelerators"]);
        // Shared affiliation strings dedupe at the article level.
        assert_eq!(a.affiliations.len(), 1);
        assert_eq!(a.publication_types, vec!["Journal Article"]);
        assert_eq!(a.keywords, vec!["dosimetry"]);
        assert_eq!(a.doi.as_deref(), Some("10.1002/mp.13394"));
    }

    #[test]
    fn test_medline_date_fallback() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>100</PMID>
            <Article>
              <Journal><JournalIssue>
                <PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate>
              </JournalIssue></Journal>
              <ArticleTitle>T</ArticleTitle>
            </Article>
        </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let articles = parse_article_set(xml);
        assert_eq!(articles[0].pub_date.year, Some(1998));
        assert_eq!(articles[0].pub_date.month, None);
    }

    #[test]
    fn test_missing_date_is_empty_not_error() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>101</PMID>
            <Article><ArticleTitle>No date</ArticleTitle></Article>
        </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let articles = parse_article_set(xml);
        assert_eq!(articles.len(), 1);
        assert!(articles[0].pub_date.is_empty());
        assert_eq!(articles[0].pub_date.display(), "");
    }

    #[test]
    fn test_record_without_pmid_is_skipped() {
        let xml = r#"<PubmedArticleSet>
          <PubmedArticle><MedlineCitation>
            <Article><ArticleTitle>Orphan</ArticleTitle></Article>
          </MedlineCitation></PubmedArticle>
          <PubmedArticle><MedlineCitation>
            <PMID>102</PMID>
            <Article><ArticleTitle>Kept</ArticleTitle></Article>
          </MedlineCitation></PubmedArticle>
        </PubmedArticleSet>"#;
        let articles = parse_article_set(xml);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].pmid, "102");
    }

    #[test]
    fn test_collective_author() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>103</PMID>
            <Article>
              <ArticleTitle>T</ArticleTitle>
              <AuthorList>
                <Author><CollectiveName>AAPM Task Group 51</CollectiveName></Author>
              </AuthorList>
            </Article>
        </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let articles = parse_article_set(xml);
        assert_eq!(articles[0].authors, vec!["AAPM Task Group 51"]);
    }

    #[test]
    fn test_truncated_xml_returns_complete_prefix() {
        let xml = r#"<PubmedArticleSet>
          <PubmedArticle><MedlineCitation>
            <PMID>104</PMID>
            <Article><ArticleTitle>Complete</ArticleTitle></Article>
          </MedlineCitation></PubmedArticle>
          <PubmedArticle><MedlineCitation><PMID>105</PMID></Unbalanced>"#;
        let articles = parse_article_set(xml);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].pmid, "104");
    }
}
