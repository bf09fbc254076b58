//! Getting started guide

const GUIDE: &str = r#"
PERFKIT QUICKSTART
==================

perfkit collects Go pprof profiles and k6 load test summaries, extracts
their key metrics and shows how those metrics move between captures.


1. EXPOSE PPROF IN YOUR GO APP
------------------------------

    import _ "net/http/pprof"

    go func() { http.ListenAndServe("localhost:6060", nil) }()

Profiles are then served under http://localhost:6060/debug/pprof/


2. START THE COLLECTOR
----------------------

    perfkit server                 # http://localhost:8080
    perfkit server --port 9090


3. CAPTURE PROFILES
-------------------

    # every profile type, once
    perfkit capture http://localhost:6060

    # selected types, grouped in a session
    perfkit capture http://localhost:6060 --profiles heap,cpu --session load-test

    # every 30 seconds until Ctrl-C, or 5 rounds
    perfkit capture http://localhost:6060 --interval 30s --session monitoring
    perfkit capture http://localhost:6060 --interval 10s --count 5


4. BROWSE AND COMPARE
---------------------

    perfkit session ls
    perfkit session profiles load-test
    perfkit get load-test <profile-id>
    perfkit get load-test <profile-id> --raw > heap.pb.gz

    perfkit compare <id1> <id2> <id3>
    perfkit compare --session load-test --type heap


PROFILE TYPES
-------------

    cpu          CPU usage sampled over --cpu-duration (default 30s)
    heap         Memory in use and allocated (snapshot)
    goroutine    Goroutine stacks (snapshot)
    block        Blocking operations (cumulative since start)
    mutex        Mutex contention (cumulative since start)
    allocs       All allocations (cumulative since start)
    threadcreate Thread creation stacks


K6 LOAD TESTS
-------------

    k6 run --summary-export=baseline.json script.js
    curl -X POST "http://localhost:8080/api/k6/ingest?session=api&name=baseline" \
      --data-binary @baseline.json

    k6 run --summary-export=optimized.json script.js
    curl -X POST "http://localhost:8080/api/k6/ingest?session=api&name=optimized" \
      --data-binary @optimized.json

    perfkit compare --session api --type k6


API
---

    POST /api/pprof/ingest?type=heap&session=s   Ingest a pprof profile
    POST /api/k6/ingest?session=s&name=run1      Ingest a k6 summary
    GET  /api/profiles                           List profiles
    GET  /api/profiles/{id}                      Profile metadata and metrics
    GET  /api/profiles/{id}?raw=true             Download the raw profile
    GET  /api/profiles/compare?ids=id1,id2       Compare profiles
    GET  /api/sessions                           List sessions
    GET  /healthz /readyz /metrics               Admin endpoints

"#;

pub fn run() {
    print!("{}", GUIDE);
}
