//! In-memory portal implementing `NavigableSession`
//!
//! Pages are keyed by URL; each page maps a selector's raw value to the
//! elements it matches. Clicking an element can redirect (used for the login
//! button), and navigation to a URL can be made to fail a number of times.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use instrec_backup::services::{LoginSelectors, PortalLayout};
use instrec_backup::session::{DriverError, DriverResult, ElementHandle, NavigableSession, Selector};

pub const LOGIN_URL: &str = "https://portal.test/signin";
pub const HOME_URL: &str = "https://portal.test/admin/home";
pub const LISTING_URL: &str = "https://portal.test/admin/instructor-list";

/// One element on a fake page
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub attrs: HashMap<String, String>,
}

impl FakeElement {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            attrs: HashMap::new(),
        }
    }

    pub fn link(href: &str, text: &str) -> Self {
        let mut element = Self::text(text);
        element.attrs.insert("href".to_string(), href.to_string());
        element
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, selector: &Selector, elements: Vec<FakeElement>) -> Self {
        self.elements.insert(selector.value().to_string(), elements);
        self
    }
}

#[derive(Default)]
struct PortalState {
    pages: HashMap<String, FakePage>,
    current_url: String,
    handles: Vec<FakeElement>,
    on_click: HashMap<String, String>,
    nav_failures: HashMap<String, usize>,
    navigations: Vec<String>,
    inputs: Vec<(String, String)>,
    clicks: Vec<String>,
    selections: Vec<(String, String)>,
}

impl PortalState {
    fn current_page(&self) -> Option<&FakePage> {
        self.pages.get(&self.current_url)
    }

    fn matching(&self, selector: &Selector) -> Vec<FakeElement> {
        self.current_page()
            .and_then(|page| page.elements.get(selector.value()))
            .cloned()
            .unwrap_or_default()
    }

    fn first(&self, selector: &Selector) -> DriverResult<FakeElement> {
        self.matching(selector)
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoSuchElement(selector.to_string()))
    }

    fn handle(&self, element: &ElementHandle) -> DriverResult<FakeElement> {
        element
            .0
            .parse::<usize>()
            .ok()
            .and_then(|i| self.handles.get(i).cloned())
            .ok_or_else(|| DriverError::StaleElement(element.0.clone()))
    }
}

/// Scriptable fake portal
#[derive(Default)]
pub struct FakePortal {
    state: Mutex<PortalState>,
}

impl FakePortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: &str, page: FakePage) {
        self.state.lock().unwrap().pages.insert(url.to_string(), page);
    }

    /// Clicking `selector` moves the browser to `url`
    pub fn redirect_on_click(&self, selector: &Selector, url: &str) {
        self.state
            .lock()
            .unwrap()
            .on_click
            .insert(selector.value().to_string(), url.to_string());
    }

    /// The next `times` navigations to `url` fail
    pub fn fail_navigation(&self, url: &str, times: usize) {
        self.state
            .lock()
            .unwrap()
            .nav_failures
            .insert(url.to_string(), times);
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn navigation_count(&self, url: &str) -> usize {
        self.navigations().iter().filter(|u| u.as_str() == url).count()
    }

    pub fn inputs(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().inputs.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn selections(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().selections.clone()
    }

    /// Login page whose submit button redirects into the admin area
    pub fn with_login_form(self) -> Self {
        let selectors = LoginSelectors::default();
        self.add_page(
            LOGIN_URL,
            FakePage::new()
                .with(&selectors.username, vec![FakeElement::default()])
                .with(&selectors.password, vec![FakeElement::default()])
                .with(&selectors.remember, vec![FakeElement::default()])
                .with(&selectors.submit, vec![FakeElement::text("Log In")]),
        );
        self.redirect_on_click(&selectors.submit, HOME_URL);
        self
    }

    /// Listing page with the given owners, each with its own record page
    pub fn with_owners(self, owners: &[OwnerFixture]) -> Self {
        let layout = PortalLayout::default();
        let selectors = LoginSelectors::default();

        let mut anchors = Vec::new();
        let mut cells = Vec::new();

        for (i, owner) in owners.iter().enumerate() {
            let owner_url = owner_url(i);
            anchors.push(FakeElement::link(&owner_url, "Records"));
            cells.push(FakeElement::text(&format!("{}\n{}", owner.raw_name, owner.email)));

            let owner_page = match &owner.records {
                None => FakePage::new().with(
                    &layout.no_records_marker,
                    vec![FakeElement::text("There are no records found")],
                ),
                Some(records) => {
                    let mut links = Vec::new();
                    for (j, attachment) in records.iter().enumerate() {
                        let url = record_url(i, j);
                        links.push(FakeElement::link(&url, "View record"));

                        let page = match attachment {
                            Some((name, href)) => FakePage::new()
                                .with(&layout.view_link, vec![FakeElement::link(href, name)]),
                            None => FakePage::new(),
                        };
                        self.add_page(&url, page);
                    }
                    FakePage::new().with(&layout.record_anchors, links)
                }
            };
            self.add_page(&owner_url, owner_page);
        }

        self.add_page(
            LISTING_URL,
            FakePage::new()
                .with(&layout.owner_anchors, anchors)
                .with(&layout.name_cells, cells)
                .with(&selectors.show_all, vec![FakeElement::default()]),
        );
        self
    }
}

pub fn owner_url(index: usize) -> String {
    format!("https://portal.test/admin/instructor-record?id={}", index)
}

pub fn record_url(owner: usize, record: usize) -> String {
    format!("https://portal.test/admin/ts-class-view?owner={}&rec={}", owner, record)
}

/// One listing row and its records
#[derive(Debug, Clone)]
pub struct OwnerFixture {
    pub raw_name: String,
    pub email: String,
    /// `None`: the owner page shows the no-records marker.
    /// Per record: `Some((file name, file url))`, or `None` for no attachment.
    pub records: Option<Vec<Option<(String, String)>>>,
}

impl OwnerFixture {
    pub fn new(raw_name: &str, email: &str) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            email: email.to_string(),
            records: Some(Vec::new()),
        }
    }

    pub fn without_records(mut self) -> Self {
        self.records = None;
        self
    }

    pub fn file(mut self, name: &str, url: &str) -> Self {
        self.records
            .get_or_insert_with(Vec::new)
            .push(Some((name.to_string(), url.to_string())));
        self
    }

    pub fn record_without_file(mut self) -> Self {
        self.records.get_or_insert_with(Vec::new).push(None);
        self
    }
}

#[async_trait::async_trait]
impl NavigableSession for FakePortal {
    async fn navigate_to(&self, url: &str) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());

        if let Some(remaining) = state.nav_failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::Network(format!("connection reset loading {}", url)));
            }
        }

        state.current_url = url.to_string();
        Ok(())
    }

    async fn find_elements(&self, selector: &Selector) -> DriverResult<Vec<ElementHandle>> {
        let mut state = self.state.lock().unwrap();
        let found = state.matching(selector);
        let mut handles = Vec::with_capacity(found.len());
        for element in found {
            handles.push(ElementHandle(state.handles.len().to_string()));
            state.handles.push(element);
        }
        Ok(handles)
    }

    async fn element_exists(&self, selector: &Selector, _timeout: Duration) -> bool {
        !self.state.lock().unwrap().matching(selector).is_empty()
    }

    async fn get_attribute(&self, selector: &Selector, name: &str) -> DriverResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .matching(selector)
            .first()
            .and_then(|e| e.attrs.get(name).cloned()))
    }

    async fn get_text(&self, selector: &Selector, _timeout: Duration) -> DriverResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.matching(selector).first().map(|e| e.text.clone()))
    }

    async fn input_text(&self, selector: &Selector, value: &str) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.first(selector)?;
        state.inputs.push((selector.value().to_string(), value.to_string()));
        Ok(())
    }

    async fn click_element(&self, selector: &Selector) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.first(selector)?;
        state.clicks.push(selector.value().to_string());
        if let Some(target) = state.on_click.get(selector.value()).cloned() {
            state.current_url = target;
        }
        Ok(())
    }

    async fn select_option(&self, selector: &Selector, label: &str) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.first(selector)?;
        state
            .selections
            .push((selector.value().to_string(), label.to_string()));
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.state.lock().unwrap().current_url.clone())
    }

    async fn element_attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.handle(element)?.attrs.get(name).cloned())
    }

    async fn element_text(&self, element: &ElementHandle) -> DriverResult<String> {
        let state = self.state.lock().unwrap();
        Ok(state.handle(element)?.text)
    }
}
