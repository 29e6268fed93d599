use rollcall_core::Aggregate;

/// Execute an aggregate command in place (no IO, no persistence).
///
/// Decides notifications with `handle`, then applies each of them. Nothing is
/// applied when the command is rejected. Infrastructure that persists and
/// publishes goes through the command dispatcher instead.
pub fn execute<A>(
    aggregate: &mut A,
    command: &A::Command,
) -> Result<Vec<A::Notification>, A::Error>
where
    A: Aggregate,
{
    let notifications = aggregate.handle(command)?;
    for n in &notifications {
        aggregate.apply(n);
    }
    Ok(notifications)
}
