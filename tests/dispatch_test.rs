use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use taskpool_rs::prelude::*;

// only one main loop may exist per process
static MAIN_LOOP_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn test_install_twice_fails() {
    let _serial = MAIN_LOOP_LOCK.lock();

    let main_loop = MainLoop::install().unwrap();
    assert!(matches!(MainLoop::install(), Err(Error::MainLoopInstalled)));

    let other = thread::spawn(|| MainLoop::install().map(|_| ()))
        .join()
        .unwrap();
    assert!(matches!(other, Err(Error::MainLoopInstalled)));

    drop(main_loop);
    let again = MainLoop::install().unwrap();
    drop(again);
}

#[test]
fn test_is_gui_thread() {
    let _serial = MAIN_LOOP_LOCK.lock();

    assert_eq!(is_gui_thread(), None);
    let main_loop = MainLoop::install().unwrap();

    assert_eq!(is_gui_thread(), Some(true));
    let elsewhere = thread::spawn(is_gui_thread).join().unwrap();
    assert_eq!(elsewhere, Some(false));

    drop(main_loop);
    assert_eq!(is_gui_thread(), None);
}

#[test]
fn test_async_never_runs_inline() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let main_loop = MainLoop::install().unwrap();
    let ran = Arc::new(AtomicBool::new(false));

    let flag = ran.clone();
    exec_in_main_thread_async(move || flag.store(true, Ordering::SeqCst)).unwrap();
    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(main_loop.pending_events(), 1);

    assert_eq!(main_loop.process_events(), 1);
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_async_from_worker_runs_on_main_thread() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let main_loop = MainLoop::install().unwrap();
    let pool = ThreadPool::with_threads(2).unwrap();
    let main_id = thread::current().id();
    let seen_on_main = Arc::new(AtomicBool::new(false));

    let seen = seen_on_main.clone();
    pool.execute(move || {
        exec_in_main_thread_async(move || {
            seen.store(thread::current().id() == main_id, Ordering::SeqCst);
        })
        .unwrap();
    })
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    main_loop.run_until(|| seen_on_main.load(Ordering::SeqCst) || Instant::now() > deadline);
    assert!(seen_on_main.load(Ordering::SeqCst));
}

#[test]
fn test_sync_inline_on_main_thread() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let main_loop = MainLoop::install().unwrap();

    let value = exec_in_main_thread_sync(|| 6 * 7).unwrap();
    assert_eq!(value, 42);
    assert_eq!(main_loop.pending_events(), 0);
}

#[test]
fn test_main_thread_wait_pumps_sync_requests() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let _main_loop = MainLoop::install().unwrap();
    let pool = ThreadPool::with_threads(1).unwrap();
    let main_id = thread::current().id();

    let (tx, rx) = bounded(1);
    let id = pool
        .execute(move || {
            // the main thread is inside wait_all below; this must not deadlock
            let on_main = exec_in_main_thread_sync(move || thread::current().id() == main_id);
            tx.send(on_main).unwrap();
        })
        .unwrap();

    assert!(pool.wait_all(&[id], None));
    assert!(rx.recv().unwrap().unwrap());
}

#[test]
fn test_group_wait_on_main_thread_pumps_events() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let _main_loop = MainLoop::install().unwrap();
    let pool = ThreadPool::with_threads(2).unwrap();
    let total = Arc::new(AtomicUsize::new(0));

    let mut group = TaskGroup::new(&pool);
    for i in 0..8 {
        let total = total.clone();
        group.enqueue(
            move || {
                let doubled = exec_in_main_thread_sync(move || i * 2).unwrap();
                total.fetch_add(doubled, Ordering::SeqCst);
            },
            TaskPriority::Normal,
        );
    }

    assert!(group.wait_all(None));
    assert_eq!(total.load(Ordering::SeqCst), (0..8).map(|i| i * 2).sum::<usize>());
}

#[test]
fn test_main_thread_wait_honors_stop_flag() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let _main_loop = MainLoop::install().unwrap();
    let pool = ThreadPool::with_threads(1).unwrap();
    let (release_tx, release_rx) = bounded::<()>(0);

    let id = pool
        .execute(move || {
            let _ = release_rx.recv();
        })
        .unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let raiser = {
        let stop = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stop.store(true, Ordering::SeqCst);
        })
    };

    assert!(!pool.wait_all(&[id], Some(&stop)));
    raiser.join().unwrap();

    drop(release_tx);
    assert!(pool.wait_all(&[id], None));
}

#[test]
fn test_main_thread_wait_returns_for_short_tasks() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let _main_loop = MainLoop::install().unwrap();
    let pool = ThreadPool::with_threads(1).unwrap();

    // raised only if some finished task goes unnoticed
    let stop = Arc::new(AtomicBool::new(false));
    let (finished_tx, finished_rx) = bounded::<()>(0);
    let watchdog = {
        let stop = stop.clone();
        thread::spawn(move || {
            let _ = finished_rx.recv_timeout(Duration::from_secs(10));
            stop.store(true, Ordering::SeqCst);
        })
    };

    for round in 0..200u64 {
        let id = pool
            .execute(move || {
                let spin_until = Instant::now() + Duration::from_micros(round % 50);
                while Instant::now() < spin_until {}
            })
            .unwrap();

        assert!(pool.wait_all(&[id], Some(&stop)), "round {} missed completion", round);
    }

    drop(finished_tx);
    watchdog.join().unwrap();
}

#[test]
fn test_sync_panic_is_reported() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let main_loop = MainLoop::install().unwrap();

    let caller = thread::spawn(|| exec_in_main_thread_sync(|| -> u32 { panic!("bad widget") }));

    let deadline = Instant::now() + Duration::from_secs(5);
    main_loop.run_until(|| caller.is_finished() || Instant::now() > deadline);

    match caller.join().unwrap() {
        Err(Error::TaskPanicked { message }) => assert!(message.contains("bad widget")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_sync_inline_panic_is_reported() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let _main_loop = MainLoop::install().unwrap();

    let result = exec_in_main_thread_sync(|| -> u32 { panic!("inline widget") });
    match result {
        Err(Error::TaskPanicked { message }) => assert_eq!(message, "inline widget"),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_sync_without_main_loop() {
    let _serial = MAIN_LOOP_LOCK.lock();

    let result = thread::spawn(|| exec_in_main_thread_sync(|| 1)).join().unwrap();
    assert!(matches!(result, Err(Error::MainLoopUnavailable)));
}

#[test]
fn test_sync_fails_when_loop_dropped_before_running() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let main_loop = MainLoop::install().unwrap();

    let caller = thread::spawn(|| exec_in_main_thread_sync(|| 1));

    let deadline = Instant::now() + Duration::from_secs(5);
    while main_loop.pending_events() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    drop(main_loop);

    let result = caller.join().unwrap();
    assert!(matches!(result, Err(Error::MainLoopUnavailable)));
}

#[test]
fn test_exec_unlocked_off_main_thread() {
    let _serial = MAIN_LOOP_LOCK.lock();

    let caller = thread::current().id();
    let ran_elsewhere = exec_unlocked(move || thread::current().id() != caller).unwrap();
    assert!(ran_elsewhere);
}

#[test]
fn test_exec_unlocked_keeps_main_loop_alive() {
    let _serial = MAIN_LOOP_LOCK.lock();
    let _main_loop = MainLoop::install().unwrap();

    // the unlocked closure needs the main thread while it is blocked in exec_unlocked
    let answer = exec_unlocked(|| exec_in_main_thread_sync(|| "pong").unwrap()).unwrap();
    assert_eq!(answer, "pong");
}

#[test]
fn test_exec_unlocked_reports_panic() {
    let _serial = MAIN_LOOP_LOCK.lock();

    let result = exec_unlocked::<_, ()>(|| panic!("unlocked failure"));
    assert!(matches!(result, Err(Error::TaskPanicked { .. })));
}
