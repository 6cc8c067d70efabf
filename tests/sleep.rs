use std::error::Error;
use std::time::{Duration, Instant};

use deferred::time::{self, sleep, Timer};

#[deferred::test]
async fn just_sleep() -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    sleep(Duration::from_millis(50)).await?;
    assert!(start.elapsed() >= Duration::from_millis(50));
    Ok(())
}

#[deferred::test]
async fn sleep_until_deadline() -> Result<(), Box<dyn Error>> {
    let deadline = Instant::now() + Duration::from_millis(20);
    time::sleep_until(deadline).await?;
    assert!(Instant::now() >= deadline);
    Ok(())
}

#[deferred::test]
async fn timers_fire_in_deadline_order() -> Result<(), Box<dyn Error>> {
    let late = Timer::after(Duration::from_millis(30));
    let early = Timer::after(Duration::from_millis(10));
    let late_at = late.await?;
    assert!(early.value().is_some_and(|early_at| early_at <= late_at));
    Ok(())
}

#[test]
#[should_panic(expected = "inside an existing block_on")]
fn nested_block_on_panics() {
    deferred::runtime::block_on(async {
        deferred::runtime::block_on(async {});
    });
}

#[test]
#[should_panic(expected = "ran out of work")]
fn block_on_never_settling_value_panics() {
    let never = deferred::race(Vec::<deferred::Resolution<u8>>::new());
    let _ = deferred::runtime::block_on(never);
}

#[deferred::test]
async fn sleeps_run_concurrently() -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let (short, long) = futures_lite::future::zip(
        time::after(Duration::from_millis(10), "short"),
        time::after(Duration::from_millis(40), "long"),
    )
    .await;
    assert_eq!((short?, long?), ("short", "long"));
    assert!(start.elapsed() >= Duration::from_millis(40));
    Ok(())
}
