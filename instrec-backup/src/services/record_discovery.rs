//! Record discovery
//!
//! Scrapes the portal through the navigable session: owner rows from the
//! instructor listing, record links from an owner's record page, and the single
//! "View" attachment link from a record page. A missing element for one unit
//! is logged and that unit skipped; only an unreadable listing is an error the
//! caller cannot skip past.

use std::time::Duration;

use crate::error::{BackupError, BackupResult};
use crate::models::{FileRef, OwnerKey, OwnerListing, RecordRef};
use crate::session::{NavigableSession, Selector};

/// Where things live on the portal's pages
#[derive(Debug, Clone)]
pub struct PortalLayout {
    /// Per-owner links to the instructor record page
    pub owner_anchors: Selector,
    /// Listing cells holding the name (first line) and account (second line)
    pub name_cells: Selector,
    /// Record detail links on an instructor record page
    pub record_anchors: Selector,
    /// "There are no records found" cell under "Course Details"
    pub no_records_marker: Selector,
    /// Attachment link on a record detail page
    pub view_link: Selector,
    pub no_records_timeout: Duration,
    pub view_link_timeout: Duration,
    pub view_text_timeout: Duration,
}

impl Default for PortalLayout {
    fn default() -> Self {
        Self {
            owner_anchors: Selector::xpath("//td/a[contains(@href, 'instructor-record')]"),
            name_cells: Selector::xpath("//td/a[contains(@href, 'mail')]/parent::td"),
            record_anchors: Selector::xpath("//td/a[contains(@href, 'ts-class-view')]"),
            no_records_marker: Selector::xpath(
                "//h3[contains(text(), 'Course Details')]/parent::div/following-sibling::div/div/div[contains(text(), 'There are no records found')]",
            ),
            view_link: Selector::xpath("//a[@title='View']"),
            no_records_timeout: Duration::from_secs(1),
            view_link_timeout: Duration::from_secs(1),
            view_text_timeout: Duration::from_secs(3),
        }
    }
}

/// Records found on an owner's page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordListing {
    /// The portal shows its "no records" marker
    NoRecords,
    Records {
        records: Vec<RecordRef>,
        /// Record links whose target could not be read
        unreadable: usize,
    },
}

/// Page-scrape discovery over a navigable session
#[derive(Debug, Clone, Default)]
pub struct RecordDiscovery {
    layout: PortalLayout,
}

impl RecordDiscovery {
    pub fn new(layout: PortalLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PortalLayout {
        &self.layout
    }

    /// Read every owner row from the listing page the session is on
    ///
    /// Owner links and name cells are paired by position.
    pub async fn discover_owners<S: NavigableSession + ?Sized>(
        &self,
        session: &mut S,
    ) -> BackupResult<Vec<OwnerListing>> {
        let anchors = session.find_elements(&self.layout.owner_anchors).await?;
        let cells = session.find_elements(&self.layout.name_cells).await?;

        if anchors.len() != cells.len() {
            tracing::warn!(
                links = anchors.len(),
                names = cells.len(),
                "Owner link and name cell counts differ, pairing the shorter run"
            );
        }

        let mut listings = Vec::with_capacity(anchors.len().min(cells.len()));

        for (index, (anchor, cell)) in anchors.iter().zip(cells.iter()).enumerate() {
            let row = index + 1;

            let href = match session.element_attribute(anchor, "href").await {
                Ok(Some(href)) if !href.trim().is_empty() => href,
                Ok(_) => {
                    tracing::warn!(row, "Owner row without a record link, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(row, error = %e, "Could not read owner link, skipping");
                    continue;
                }
            };

            let text = match session.element_text(cell).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(row, error = %e, "Could not read owner name cell, using empty name");
                    String::new()
                }
            };

            let (raw_name, identifying_text) = split_name_cell(&text);
            listings.push(OwnerListing {
                raw_name,
                identifying_text,
                record_list_url: href,
            });
        }

        tracing::info!(owners = listings.len(), "Owner listing read");
        Ok(listings)
    }

    /// Open an owner's record page and collect its record links
    pub async fn discover_records<S: NavigableSession + ?Sized>(
        &self,
        session: &mut S,
        owner: &OwnerKey,
        listing: &OwnerListing,
    ) -> BackupResult<RecordListing> {
        session.navigate_to(&listing.record_list_url).await?;

        if session
            .element_exists(&self.layout.no_records_marker, self.layout.no_records_timeout)
            .await
        {
            tracing::info!(owner = %owner, "No records found for owner");
            return Ok(RecordListing::NoRecords);
        }

        let anchors = session.find_elements(&self.layout.record_anchors).await?;
        let mut records = Vec::with_capacity(anchors.len());
        let mut unreadable = 0;

        for (index, anchor) in anchors.iter().enumerate() {
            match session.element_attribute(anchor, "href").await {
                Ok(Some(href)) if !href.trim().is_empty() => records.push(RecordRef {
                    owner_key: owner.clone(),
                    source_url: href,
                }),
                Ok(_) => {
                    unreadable += 1;
                    tracing::warn!(owner = %owner, record = index + 1, "Record link without href, skipping");
                }
                Err(e) => {
                    unreadable += 1;
                    tracing::warn!(owner = %owner, record = index + 1, error = %e, "Could not read record link, skipping");
                }
            }
        }

        tracing::info!(owner = %owner, records = records.len(), "Records found for owner");
        Ok(RecordListing::Records { records, unreadable })
    }

    /// Open a record page and read its attachment link
    ///
    /// # Returns
    /// `None` when the record has no attached file
    pub async fn discover_file<S: NavigableSession + ?Sized>(
        &self,
        session: &mut S,
        record: &RecordRef,
    ) -> BackupResult<Option<FileRef>> {
        session.navigate_to(&record.source_url).await?;

        if !session
            .element_exists(&self.layout.view_link, self.layout.view_link_timeout)
            .await
        {
            return Ok(None);
        }

        let file_name = session
            .get_text(&self.layout.view_link, self.layout.view_text_timeout)
            .await?
            .map(|name| name.trim().to_string())
            .unwrap_or_default();
        validate_file_name(&file_name).map_err(BackupError::Discovery)?;

        let source_url = session
            .get_attribute(&self.layout.view_link, "href")
            .await?
            .filter(|href| !href.trim().is_empty())
            .ok_or_else(|| {
                BackupError::Discovery(format!("View link for {} has no target", file_name))
            })?;

        Ok(Some(FileRef {
            owner_key: record.owner_key.clone(),
            file_name,
            source_url,
        }))
    }
}

/// First line is the name, the second the identifying text
fn split_name_cell(text: &str) -> (String, Option<String>) {
    let mut lines = text.lines().map(str::trim);
    let raw_name = lines.next().unwrap_or_default().to_string();
    let identifying_text = lines
        .next()
        .filter(|line| !line.is_empty())
        .map(str::to_string);
    (raw_name, identifying_text)
}

/// Reject names that would leave the owner directory or name nothing
pub fn validate_file_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("attachment has an empty file name".to_string());
    }
    if name == "." || name == ".." {
        return Err(format!("attachment file name {:?} is not a file", name));
    }
    if name.contains(&['/', '\\', '\0'][..]) {
        return Err(format!("attachment file name {:?} contains a path separator", name));
    }
    Ok(())
}
