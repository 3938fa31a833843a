//! 无头宿主环境
//!
//! 浏览器全局对象的最小替身：window/document、console、定时器、
//! 事件监听和 fetch。所有时间都来自事件循环的虚拟时钟。

use super::runtime::JsRuntime;
use crate::error::Result;
use std::cell::Cell;
use std::rc::Rc;

/// 虚拟时钟起点（毫秒，2024-01-01T00:00:00Z）
pub const CLOCK_ORIGIN_MS: u64 = 1_704_067_200_000;

pub struct HostApi<'a> {
    runtime: &'a JsRuntime,
    clock: Rc<Cell<u64>>,
}

impl<'a> HostApi<'a> {
    pub fn new(runtime: &'a JsRuntime, clock: Rc<Cell<u64>>) -> Self {
        Self { runtime, clock }
    }

    /// 初始化所有宿主 API
    pub fn init(&self) -> Result<()> {
        self.init_globals()?;
        self.init_console()?;
        self.init_clock()?;
        self.init_timer_api()?;
        self.init_events()?;
        self.init_document()?;
        self.init_network()?;
        tracing::trace!("host api installed");
        Ok(())
    }

    fn init_globals(&self) -> Result<()> {
        self.runtime.eval_named(
            "globals",
            r#"
            globalThis.window = globalThis;
            globalThis.self = globalThis;
            globalThis.__PREVIEW_BINDINGS__ = {};
            globalThis.__preview = {};
            globalThis.navigator = { userAgent: 'live-preview-headless', language: 'en-US', onLine: false };
            globalThis.location = { href: 'about:srcdoc', origin: 'null', protocol: 'about:', host: '', pathname: 'srcdoc', search: '', hash: '' };
            globalThis.__format_args = function (args) {
                return Array.prototype.map.call(args, function (a) {
                    if (typeof a === 'string') return a;
                    if (a instanceof Error) return (a.name || 'Error') + ': ' + a.message;
                    if (typeof a === 'function') return '[Function ' + (a.name || 'anonymous') + ']';
                    try { return JSON.stringify(a); } catch (e) { return String(a); }
                }).join(' ');
            };
        "#,
        )?;
        Ok(())
    }

    fn init_console(&self) -> Result<()> {
        self.runtime.eval_named(
            "console",
            r#"
            globalThis.console = {
                log: function () { __native_console('log', __format_args(arguments)); },
                info: function () { __native_console('info', __format_args(arguments)); },
                warn: function () { __native_console('warn', __format_args(arguments)); },
                error: function () { __native_console('error', __format_args(arguments)); },
                debug: function () { __native_console('debug', __format_args(arguments)); },
                trace: function () {},
                group: function () {},
                groupEnd: function () {},
                table: function (t) { __native_console('log', __format_args([t])); }
            };
        "#,
        )?;
        Ok(())
    }

    fn init_clock(&self) -> Result<()> {
        let clock = self.clock.clone();
        self.runtime
            .register_function("__native_now", move |_args| clock.get().to_string())?;
        self.runtime.eval_named(
            "clock",
            &format!(
                r#"
            (function () {{
                var origin = {origin};
                Date.now = function () {{ return origin + Number(__native_now()); }};
                globalThis.performance = {{ now: function () {{ return Number(__native_now()); }} }};
            }})();
        "#,
                origin = CLOCK_ORIGIN_MS
            ),
        )?;
        Ok(())
    }

    fn init_timer_api(&self) -> Result<()> {
        self.runtime.eval_named(
            "timers",
            r#"
            (function (global) {
                var timers = {};
                var nextId = 0;

                function schedule(callback, delay, args, repeat) {
                    var id = ++nextId;
                    timers[id] = { callback: callback, args: args, repeat: repeat };
                    var ms = Math.max(0, Math.floor(Number(delay) || 0));
                    __native_set_timer(String(id), String(ms), repeat ? 'true' : 'false');
                    return id;
                }

                global.setTimeout = function (callback, delay) {
                    return schedule(callback, delay, Array.prototype.slice.call(arguments, 2), false);
                };
                global.setInterval = function (callback, delay) {
                    return schedule(callback, delay, Array.prototype.slice.call(arguments, 2), true);
                };
                global.clearTimeout = function (id) {
                    if (timers[id]) {
                        delete timers[id];
                        __native_clear_timer(String(id));
                    }
                };
                global.clearInterval = global.clearTimeout;

                global.requestAnimationFrame = function (callback) {
                    return global.setTimeout(function () { callback(performance.now()); }, 16);
                };
                global.cancelAnimationFrame = global.clearTimeout;

                global.queueMicrotask = function (callback) {
                    Promise.resolve().then(function () {
                        try { callback(); } catch (e) { global.__dispatch_error(e); }
                    });
                };

                global.__trigger_timer = function (id) {
                    var timer = timers[id];
                    if (!timer) return;
                    if (!timer.repeat) delete timers[id];
                    if (typeof timer.callback !== 'function') return;
                    global.__guard(function () { return timer.callback.apply(global, timer.args); });
                };
            })(globalThis);
        "#,
        )?;
        Ok(())
    }

    /// window 级事件：error / unhandledrejection 由故障边界订阅
    fn init_events(&self) -> Result<()> {
        self.runtime.eval_named(
            "events",
            r#"
            (function (global) {
                var listeners = {};

                global.addEventListener = function (type, listener) {
                    (listeners[type] = listeners[type] || []).push(listener);
                };
                global.removeEventListener = function (type, listener) {
                    var list = listeners[type];
                    if (list) listeners[type] = list.filter(function (l) { return l !== listener; });
                };

                function dispatch(type, event) {
                    var list = (listeners[type] || []).slice();
                    for (var i = 0; i < list.length; i++) {
                        try { list[i](event); }
                        catch (e) { __native_console('error', 'listener for ' + type + ' threw: ' + __format_args([e])); }
                    }
                    return list.length > 0;
                }

                function event(type, extra) {
                    var e = { type: type, defaultPrevented: false };
                    e.preventDefault = function () { e.defaultPrevented = true; };
                    for (var k in extra) e[k] = extra[k];
                    return e;
                }

                global.__dispatch_error = function (error) {
                    var handled = dispatch('error', event('error', { error: error, message: error && error.message }));
                    if (!handled) __native_console('error', 'Uncaught ' + __format_args([error]));
                };

                global.__dispatch_rejection = function (reason) {
                    var handled = dispatch('unhandledrejection', event('unhandledrejection', { reason: reason }));
                    if (!handled) __native_console('error', 'Unhandled rejection ' + __format_args([reason]));
                };

                // 同步异常进入 error，返回的 Promise 被拒绝时进入 unhandledrejection
                global.__guard = function (fn) {
                    try {
                        var result = fn();
                        if (result && typeof result.then === 'function') {
                            result.then(null, global.__dispatch_rejection);
                        }
                        return result;
                    } catch (e) {
                        global.__dispatch_error(e);
                    }
                };
            })(globalThis);
        "#,
        )?;
        Ok(())
    }

    fn init_document(&self) -> Result<()> {
        self.runtime.eval_named(
            "document",
            r#"
            (function (global) {
                function element(tag, id) {
                    return {
                        tagName: String(tag).toUpperCase(),
                        id: id || '',
                        innerHTML: '',
                        style: {},
                        children: [],
                        setAttribute: function (name, value) { this[name] = String(value); },
                        getAttribute: function (name) { return this[name] === undefined ? null : this[name]; },
                        appendChild: function (child) { this.children.push(child); return child; },
                        removeChild: function (child) {
                            this.children = this.children.filter(function (c) { return c !== child; });
                            return child;
                        },
                        addEventListener: function () {},
                        removeEventListener: function () {}
                    };
                }

                var root = element('div', 'root');
                var body = element('body');
                body.appendChild(root);

                global.document = {
                    readyState: 'complete',
                    title: '',
                    body: body,
                    head: element('head'),
                    documentElement: element('html'),
                    getElementById: function (id) { return id === 'root' ? root : null; },
                    querySelector: function (sel) { return sel === '#root' ? root : null; },
                    querySelectorAll: function () { return []; },
                    createElement: function (tag) { return element(tag); },
                    createTextNode: function (text) { return { nodeType: 3, textContent: String(text) }; },
                    addEventListener: function () {},
                    removeEventListener: function () {}
                };
                global.matchMedia = function (query) {
                    return { matches: false, media: query, addEventListener: function () {}, removeEventListener: function () {}, addListener: function () {}, removeListener: function () {} };
                };
                global.getComputedStyle = function () { return {}; };
                global.localStorage = (function () {
                    var data = {};
                    return {
                        getItem: function (k) { return Object.prototype.hasOwnProperty.call(data, k) ? data[k] : null; },
                        setItem: function (k, v) { data[k] = String(v); },
                        removeItem: function (k) { delete data[k]; },
                        clear: function () { data = {}; }
                    };
                })();
                global.sessionStorage = global.localStorage;
            })(globalThis);
        "#,
        )?;
        Ok(())
    }

    /// 无头沙箱不访问网络
    fn init_network(&self) -> Result<()> {
        self.runtime.eval_named(
            "network",
            r#"
            globalThis.fetch = function (input) {
                var url = typeof input === 'string' ? input : (input && input.url) || String(input);
                return Promise.reject(new TypeError('Failed to fetch ' + url + ': network access is disabled in the headless preview'));
            };
        "#,
        )?;
        Ok(())
    }
}
