use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{base, FetchError};
use crate::models::{Category, EventRecord};

pub const PAGE_SIZE: u32 = 100;
const EVENTS_PATH: &str = "/discovery/v2/events.json";
const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone)]
pub struct EventQuery {
    pub city: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub number: u32,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}

impl PageInfo {
    /// Page to ask for after `requested`. The echoed `number` is ignored so
    /// an upstream that never advances it cannot stall the loop.
    pub fn next_after(&self, requested: u32) -> Option<u32> {
        requested
            .checked_add(1)
            .filter(|next| *next < self.total_pages)
    }
}

#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<EventRecord>,
    pub page: Option<PageInfo>,
}

pub trait EventPageSource {
    fn fetch_page(
        &self,
        query: &EventQuery,
        category: Category,
        page: u32,
    ) -> Result<EventPage, FetchError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryFailure {
    pub category: Category,
    pub page: u32,
    pub error: String,
}

/// Everything one event search produced, including which categories came
/// back short. A partial result is still a valid result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventSearch {
    pub events: Vec<EventRecord>,
    pub failures: Vec<CategoryFailure>,
    pub skipped: Vec<Category>,
}

impl EventSearch {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    /// Ids returned by more than one category, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order = Vec::new();
        for event in &self.events {
            if event.id.is_empty() {
                continue;
            }
            let count = counts.entry(event.id.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(event.id.as_str());
            }
        }
        order
    }
}

pub fn collect_events<S: EventPageSource + ?Sized>(
    source: &S,
    query: &EventQuery,
    categories: &[Category],
) -> EventSearch {
    let mut search = EventSearch::default();

    for (idx, category) in categories.iter().copied().enumerate() {
        let first = match source.fetch_page(query, category, 0) {
            Ok(page) => page,
            Err(err) => {
                warn!(%category, "event search failed, skipping remaining categories: {err}");
                search.failures.push(CategoryFailure {
                    category,
                    page: 0,
                    error: err.to_string(),
                });
                search.skipped.extend_from_slice(&categories[idx + 1..]);
                break;
            }
        };

        let mut next = first.page.and_then(|info| info.next_after(0));
        search.events.extend(first.events);

        while let Some(page_number) = next.take() {
            match source.fetch_page(query, category, page_number) {
                Ok(page) => {
                    next = page.page.and_then(|info| info.next_after(page_number));
                    search.events.extend(page.events);
                }
                Err(err) => {
                    warn!(%category, page = page_number, "event paging stopped early: {err}");
                    search.failures.push(CategoryFailure {
                        category,
                        page: page_number,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    search
        .events
        .sort_by_key(|event| (event.start_date.is_none(), event.start_date));
    search
}

pub struct TicketmasterClient {
    base_url: String,
    api_key: String,
}

impl TicketmasterClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl EventPageSource for TicketmasterClient {
    fn fetch_page(
        &self,
        query: &EventQuery,
        category: Category,
        page: u32,
    ) -> Result<EventPage, FetchError> {
        let url = base::endpoint(&self.base_url, EVENTS_PATH)?;
        let params = query_params(query, category, page);

        debug!(%category, page, city = %query.city, "requesting events");
        let body = base::send(
            base::client()
                .get(url)
                .query(&[("apikey", self.api_key.as_str())])
                .query(&params),
        )?;
        parse_page(&body, category)
    }
}

/// Query for one page of one category, without the api key. Page 0 omits
/// the `page` parameter.
pub fn query_params(
    query: &EventQuery,
    category: Category,
    page: u32,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("city", query.city.clone()),
        ("startDateTime", query.start.format(QUERY_TIME_FORMAT).to_string()),
        ("endDateTime", query.end.format(QUERY_TIME_FORMAT).to_string()),
        ("size", PAGE_SIZE.to_string()),
        ("classificationName", category.classification_name().to_string()),
    ];
    if page > 0 {
        params.push(("page", page.to_string()));
    }
    params
}

pub fn parse_page(body: &str, category: Category) -> Result<EventPage, FetchError> {
    let response: EventsResponse = base::parse_json(body)?;
    let events = response
        .embedded
        .map(|embedded| embedded.events)
        .unwrap_or_default()
        .into_iter()
        .map(|doc| doc.into_record(category))
        .collect();

    Ok(EventPage {
        events,
        page: response.page,
    })
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedEvents>,
    page: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedEvents {
    #[serde(default)]
    events: Vec<EventDoc>,
}

#[derive(Debug, Deserialize)]
struct EventDoc {
    #[serde(default)]
    id: String,
    name: Option<String>,
    dates: Option<DatesDoc>,
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedVenues>,
    #[serde(default)]
    images: Vec<ImageDoc>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatesDoc {
    start: Option<StartDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartDoc {
    local_date: Option<String>,
    local_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedVenues {
    #[serde(default)]
    venues: Vec<VenueDoc>,
}

#[derive(Debug, Deserialize)]
struct VenueDoc {
    name: Option<String>,
    address: Option<AddressDoc>,
    location: Option<GeoDoc>,
}

#[derive(Debug, Deserialize)]
struct AddressDoc {
    line1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeoDoc {
    latitude: Option<String>,
    longitude: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageDoc {
    url: Option<String>,
}

impl EventDoc {
    fn into_record(self, category: Category) -> EventRecord {
        let start = self.dates.and_then(|dates| dates.start);
        let start_date = start
            .as_ref()
            .and_then(|s| s.local_date.as_deref())
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok());
        let start_time = start
            .as_ref()
            .and_then(|s| s.local_time.as_deref())
            .and_then(|time| NaiveTime::parse_from_str(time, "%H:%M:%S").ok());

        let venue = self
            .embedded
            .and_then(|embedded| embedded.venues.into_iter().next());
        let (venue_name, venue_address, latitude, longitude) = match venue {
            Some(venue) => {
                let (lat, lng) = venue
                    .location
                    .map(|geo| (parse_coordinate(geo.latitude), parse_coordinate(geo.longitude)))
                    .unwrap_or((None, None));
                (
                    venue.name,
                    venue.address.and_then(|address| address.line1),
                    lat,
                    lng,
                )
            }
            None => (None, None, None, None),
        };
        let (latitude, longitude) = match (latitude, longitude) {
            (Some(lat), Some(lng)) => (Some(lat), Some(lng)),
            _ => (None, None),
        };

        EventRecord {
            id: self.id,
            name: self.name.unwrap_or_else(|| "N/A".to_string()),
            start_date,
            start_time,
            venue_name: venue_name.unwrap_or_else(|| "N/A".to_string()),
            venue_address: venue_address.unwrap_or_else(|| "Address not available".to_string()),
            latitude,
            longitude,
            image_url: self.images.into_iter().next().and_then(|image| image.url),
            detail_url: self.url.unwrap_or_else(|| "#".to_string()),
            category,
        }
    }
}

fn parse_coordinate(value: Option<String>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    const SAMPLE_JSON: &str = r#"
    {
      "_embedded": {
        "events": [
          {
            "id": "vv1A",
            "name": "Desert Dwellers",
            "url": "https://www.ticketmaster.com/event/vv1A",
            "images": [{"url": "https://s1.ticketm.net/dam/a/1.jpg"}, {"url": "https://s1.ticketm.net/dam/a/2.jpg"}],
            "dates": {"start": {"localDate": "2024-11-19", "localTime": "20:00:00"}},
            "_embedded": {
              "venues": [{
                "name": "Treefort Music Hall",
                "address": {"line1": "1025 W Main St"},
                "location": {"longitude": "-116.2023", "latitude": "43.6150"}
              }]
            }
          },
          {
            "id": "vv1B",
            "name": "PUP",
            "dates": {"start": {"localDate": "2024-11-18"}},
            "_embedded": {"venues": [{"name": "Knitting Factory"}]}
          }
        ]
      },
      "page": {"size": 100, "totalElements": 2, "totalPages": 1, "number": 0}
    }
    "#;

    #[test]
    fn flattens_event_documents() {
        let page = parse_page(SAMPLE_JSON, Category::Music).expect("parse events");
        assert_eq!(page.events.len(), 2);
        assert_eq!(page.page, Some(PageInfo { number: 0, total_pages: 1 }));
        assert_eq!(page.page.and_then(|p| p.next_after(0)), None);

        let first = &page.events[0];
        assert_eq!(first.name, "Desert Dwellers");
        assert_eq!(first.start_date, NaiveDate::from_ymd_opt(2024, 11, 19));
        assert_eq!(first.start_time, NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(first.venue_name, "Treefort Music Hall");
        assert_eq!(first.venue_address, "1025 W Main St");
        assert_eq!(first.coordinates(), Some((43.6150, -116.2023)));
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://s1.ticketm.net/dam/a/1.jpg")
        );
        assert_eq!(first.category, Category::Music);

        let second = &page.events[1];
        assert_eq!(second.venue_address, "Address not available");
        assert_eq!(second.detail_url, "#");
        assert_eq!(second.coordinates(), None);
        assert_eq!(second.image_url, None);
    }

    #[test]
    fn empty_result_has_no_events() {
        let body = r#"{"page": {"size": 100, "totalElements": 0, "totalPages": 0, "number": 0}}"#;
        let page = parse_page(body, Category::Comedy).expect("parse empty");
        assert!(page.events.is_empty());
        assert_eq!(page.page.and_then(|p| p.next_after(0)), None);
    }

    #[test]
    fn next_page_follows_the_requested_page() {
        let info = PageInfo { number: 0, total_pages: 3 };
        assert_eq!(info.next_after(0), Some(1));
        assert_eq!(info.next_after(1), Some(2));
        assert_eq!(info.next_after(2), None);

        let huge = PageInfo { number: u32::MAX, total_pages: u32::MAX };
        assert_eq!(huge.next_after(u32::MAX), None);
    }

    #[test]
    fn first_page_query_has_no_page_param() {
        let params = query_params(&query(), Category::ArtsTheatre, 0);
        assert_eq!(
            params,
            vec![
                ("city", "Boise".to_string()),
                ("startDateTime", "2024-11-18T00:00:00Z".to_string()),
                ("endDateTime", "2024-11-25T23:59:59Z".to_string()),
                ("size", "100".to_string()),
                ("classificationName", "Arts & Theatre".to_string()),
            ]
        );
    }

    #[test]
    fn follow_up_page_query_names_the_page() {
        let params = query_params(&query(), Category::Sports, 2);
        assert_eq!(params.last(), Some(&("page", "2".to_string())));
        assert!(params.contains(&("classificationName", "Sports".to_string())));
        assert!(params.contains(&("size", PAGE_SIZE.to_string())));
    }

    #[test]
    fn non_json_page_is_malformed() {
        let err = parse_page("<html>oops</html>", Category::Music).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    type PageResult = Result<(Vec<(&'static str, &'static str)>, u32), u16>;

    struct FakeSource {
        pages: HashMap<(Category, u32), PageResult>,
        calls: RefCell<Vec<(Category, u32)>>,
    }

    impl FakeSource {
        fn new(pages: Vec<((Category, u32), PageResult)>) -> Self {
            Self {
                pages: pages.into_iter().collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl EventPageSource for FakeSource {
        fn fetch_page(
            &self,
            _query: &EventQuery,
            category: Category,
            page: u32,
        ) -> Result<EventPage, FetchError> {
            self.calls.borrow_mut().push((category, page));
            match self.pages.get(&(category, page)) {
                Some(Ok((events, total_pages))) => Ok(EventPage {
                    events: events
                        .iter()
                        .map(|(id, date)| record(id, date, category))
                        .collect(),
                    page: Some(PageInfo {
                        number: page,
                        total_pages: *total_pages,
                    }),
                }),
                Some(Err(status)) => Err(FetchError::Upstream {
                    status: *status,
                    body: "error".to_string(),
                }),
                None => Err(FetchError::Network("unexpected page".to_string())),
            }
        }
    }

    fn record(id: &str, date: &str, category: Category) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            start_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            start_time: None,
            venue_name: "N/A".to_string(),
            venue_address: "Address not available".to_string(),
            latitude: None,
            longitude: None,
            image_url: None,
            detail_url: "#".to_string(),
            category,
        }
    }

    fn query() -> EventQuery {
        EventQuery {
            city: "Boise".to_string(),
            start: NaiveDate::from_ymd_opt(2024, 11, 18)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .expect("start"),
            end: NaiveDate::from_ymd_opt(2024, 11, 25)
                .and_then(|d| d.and_hms_opt(23, 59, 59))
                .expect("end"),
        }
    }

    fn ids(search: &EventSearch) -> Vec<&str> {
        search.events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn failing_category_keeps_earlier_results() {
        let source = FakeSource::new(vec![
            (
                (Category::Music, 0),
                Ok((vec![("m1", "2024-11-21"), ("m2", "2024-11-19")], 2)),
            ),
            ((Category::Music, 1), Ok((vec![("m3", "2024-11-18")], 2))),
            ((Category::Sports, 0), Err(500)),
        ]);

        let search = collect_events(&source, &query(), &[Category::Music, Category::Sports]);

        assert_eq!(ids(&search), vec!["m3", "m2", "m1"]);
        assert!(search.events.iter().all(|e| e.category == Category::Music));
        assert_eq!(search.failures.len(), 1);
        assert_eq!(search.failures[0].category, Category::Sports);
        assert_eq!(search.failures[0].page, 0);
        assert!(search.skipped.is_empty());
        assert!(!search.is_complete());
    }

    #[test]
    fn first_page_failure_skips_remaining_categories() {
        let source = FakeSource::new(vec![
            ((Category::Music, 0), Err(401)),
            ((Category::Sports, 0), Ok((vec![("s1", "2024-11-20")], 1))),
        ]);

        let search = collect_events(
            &source,
            &query(),
            &[Category::Music, Category::Sports, Category::Comedy],
        );

        assert!(search.events.is_empty());
        assert_eq!(search.skipped, vec![Category::Sports, Category::Comedy]);
        assert_eq!(*source.calls.borrow(), vec![(Category::Music, 0)]);
    }

    #[test]
    fn mid_pagination_failure_moves_to_next_category() {
        let source = FakeSource::new(vec![
            ((Category::Music, 0), Ok((vec![("m1", "2024-11-22")], 3))),
            ((Category::Music, 1), Err(503)),
            ((Category::Comedy, 0), Ok((vec![("c1", "2024-11-20")], 1))),
        ]);

        let search = collect_events(&source, &query(), &[Category::Music, Category::Comedy]);

        assert_eq!(ids(&search), vec!["c1", "m1"]);
        assert_eq!(search.failures.len(), 1);
        assert_eq!(search.failures[0].page, 1);
        assert!(search.skipped.is_empty());
        assert_eq!(
            *source.calls.borrow(),
            vec![(Category::Music, 0), (Category::Music, 1), (Category::Comedy, 0)]
        );
    }

    /// Always echoes page 0 of 2, whatever was asked for.
    struct StuckSource {
        calls: RefCell<Vec<u32>>,
    }

    impl EventPageSource for StuckSource {
        fn fetch_page(
            &self,
            _query: &EventQuery,
            category: Category,
            page: u32,
        ) -> Result<EventPage, FetchError> {
            let mut calls = self.calls.borrow_mut();
            calls.push(page);
            if calls.len() > 10 {
                return Err(FetchError::Network("too many requests".to_string()));
            }
            Ok(EventPage {
                events: vec![record(&format!("e{page}"), "2024-11-20", category)],
                page: Some(PageInfo { number: 0, total_pages: 2 }),
            })
        }
    }

    #[test]
    fn paging_stops_when_upstream_repeats_page_number() {
        let source = StuckSource {
            calls: RefCell::new(Vec::new()),
        };

        let search = collect_events(&source, &query(), &[Category::Music]);

        assert_eq!(*source.calls.borrow(), vec![0, 1]);
        assert_eq!(ids(&search), vec!["e0", "e1"]);
        assert!(search.is_complete());
    }

    #[test]
    fn sort_is_stable_and_keeps_duplicates() {
        let source = FakeSource::new(vec![
            (
                (Category::Music, 0),
                Ok((vec![("fest", "2024-11-20"), ("m1", "2024-11-20")], 1)),
            ),
            (
                (Category::Festivals, 0),
                Ok((vec![("fest", "2024-11-20"), ("undated", "")], 1)),
            ),
        ]);

        let search = collect_events(&source, &query(), &[Category::Music, Category::Festivals]);

        assert_eq!(ids(&search), vec!["fest", "m1", "fest", "undated"]);
        assert_eq!(search.duplicate_ids(), vec!["fest"]);
        assert!(search.is_complete());
    }
}
