use std::convert::Infallible;

use axum::extract::Extension;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};

use crate::api::{DynAPI, FeedUpdate};
use crate::auth::User;
use crate::error::Error;
use crate::server::handlers::jobs::JobView;

fn to_event(update: FeedUpdate) -> Event {
    let event = match update {
        FeedUpdate::Job(job) => Event::default().event("job").json_data(JobView::from(job)),
        FeedUpdate::Snapshot(jobs) => Event::default()
            .event("snapshot")
            .json_data(jobs.into_iter().map(JobView::from).collect::<Vec<_>>()),
    };

    event.unwrap_or_else(|err| {
        tracing::warn!("could not encode feed update: {:?}", err);
        Event::default().event("resync")
    })
}

/// Server-sent events: a `snapshot` on every resync and a `job` whenever a
/// visible job changes.
pub async fn stream(
    Extension(api): Extension<DynAPI>,
    user: User,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Error> {
    let subscription = api.subscribe(user.clone()).await?;

    let updates = stream::unfold(
        (api, user, subscription),
        |(api, user, mut subscription)| async move {
            match api.next_update(user.clone(), &mut subscription).await {
                Ok(Some(update)) => Some((Ok(to_event(update)), (api, user, subscription))),
                Ok(None) => None,
                Err(err) => {
                    tracing::warn!("closing feed stream: {}", err);
                    None
                }
            }
        },
    );

    Ok(Sse::new(updates).keep_alive(KeepAlive::default()))
}
