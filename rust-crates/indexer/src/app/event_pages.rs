use chain::{
    ObjectId,
    events::{
        ChainEvent,
        EventKind,
    },
    rpc::{
        EventCursor,
        EventOrder,
        EventQuery,
        EventReader,
    },
};

pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Round cap for claim lookups and world discovery.
pub const DEFAULT_MAX_ROUNDS: usize = 6;
/// Round cap for listing a player's unclaimed plays.
pub const UNCLAIMED_PLAYS_MAX_ROUNDS: usize = 10;

/// Events gathered by a bounded walk over one event feed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventHistory {
    pub events: Vec<ChainEvent>,
    pub rounds: usize,
    /// The round cap stopped the walk while the feed still reported more pages.
    pub truncated: bool,
}

/// Result of a walk that stops at the first match.
#[derive(Debug, Clone, PartialEq)]
pub struct EventScan<T> {
    pub found: Option<T>,
    pub rounds: usize,
    pub truncated: bool,
}

/// Walks an event feed page by page, newest first by default.
///
/// Errors from the reader are returned as-is; nothing here retries.
pub struct EventPager<'a, R> {
    reader: &'a R,
    query: EventQuery,
    page_size: usize,
    max_rounds: usize,
    order: EventOrder,
}

impl<'a, R> EventPager<'a, R>
where
    R: EventReader,
{
    pub fn new(reader: &'a R, query: EventQuery) -> Self {
        Self {
            reader,
            query,
            page_size: DEFAULT_PAGE_SIZE,
            max_rounds: DEFAULT_MAX_ROUNDS,
            order: EventOrder::default(),
        }
    }

    pub fn for_kind(reader: &'a R, package: &ObjectId, kind: EventKind) -> Self {
        Self::new(reader, EventQuery::move_event_type(kind.type_name(package)))
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn order(mut self, order: EventOrder) -> Self {
        self.order = order;
        self
    }

    pub async fn fetch_all(&self) -> anyhow::Result<EventHistory> {
        let mut history = EventHistory::default();
        let scan = self
            .walk(|page| {
                history.events.extend_from_slice(page);
                None::<()>
            })
            .await?;
        history.rounds = scan.rounds;
        history.truncated = scan.truncated;
        Ok(history)
    }

    /// Stops at the first event for which `matcher` returns `Some`.
    pub async fn find_map<T>(
        &self,
        mut matcher: impl FnMut(&ChainEvent) -> Option<T>,
    ) -> anyhow::Result<EventScan<T>> {
        self.walk(|page| page.iter().find_map(&mut matcher)).await
    }

    async fn walk<T>(
        &self,
        mut on_page: impl FnMut(&[ChainEvent]) -> Option<T>,
    ) -> anyhow::Result<EventScan<T>> {
        let mut cursor: Option<EventCursor> = None;
        let mut rounds = 0;
        while rounds < self.max_rounds {
            let page = self
                .reader
                .query_events(&self.query, cursor.take(), self.page_size, self.order)
                .await?;
            rounds += 1;
            tracing::debug!(
                event_type = %self.query.move_event_type,
                round = rounds,
                events = page.data.len(),
                "fetched event page"
            );
            if let Some(found) = on_page(&page.data) {
                return Ok(EventScan {
                    found: Some(found),
                    rounds,
                    truncated: false,
                });
            }
            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => {
                    return Ok(EventScan {
                        found: None,
                        rounds,
                        truncated: false,
                    });
                }
            }
        }
        tracing::warn!(
            event_type = %self.query.move_event_type,
            max_rounds = self.max_rounds,
            "event history truncated at round limit"
        );
        Ok(EventScan {
            found: None,
            rounds,
            truncated: true,
        })
    }
}
